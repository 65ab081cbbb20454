//! JSON API over the collections and workflows.
//!
//! Every handler returns `Result<Envelope<_>, ApiError>`; [`ApiError`] is the
//! only place errors turn into responses.

pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;

pub use error::ApiError;
pub use state::AppState;

use crate::models::{
    CategoryInput, CategoryPatch, Favorite, FavoriteInput, FavoritePatch, MenuCategory, MenuCategoryInput,
    MenuCategoryPatch, MenuComment, MenuCommentInput, MenuCommentPatch, MenuItem, MenuItemInput, MenuItemPatch, Post,
    PostComment, PostCommentInput, PostCommentPatch, PostInput, PostPatch, Restaurant, RestaurantCategory,
    RestaurantComment, RestaurantCommentInput, RestaurantCommentPatch, User, UserInput,
};
use handlers::{accounts, catalog, crud, engagement};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/users", get(crud::list::<User>).post(crud::create::<UserInput>))
        .route(
            "/v1/users/{id}",
            get(crud::get::<User>)
                .put(accounts::update_user_handler)
                .delete(crud::delete::<User>),
        )
        .route("/v1/users/{id}/likes", get(engagement::likes_for_user))
        .route("/v1/auth/login", post(accounts::login_handler))
        .route(
            "/v1/restaurants",
            get(crud::list::<Restaurant>).post(catalog::create_restaurant_handler),
        )
        .route(
            "/v1/restaurants/{id}",
            get(crud::get::<Restaurant>)
                .put(catalog::update_restaurant_handler)
                .delete(crud::delete::<Restaurant>),
        )
        .route(
            "/v1/menuItems",
            get(crud::list::<MenuItem>).post(crud::create::<MenuItemInput>),
        )
        .route(
            "/v1/menuItems/{id}",
            get(crud::get::<MenuItem>)
                .put(crud::update::<MenuItemPatch>)
                .delete(crud::delete::<MenuItem>),
        )
        .route("/v1/posts", get(crud::list::<Post>).post(crud::create::<PostInput>))
        .route(
            "/v1/posts/{id}",
            get(crud::get::<Post>)
                .put(crud::update::<PostPatch>)
                .delete(crud::delete::<Post>),
        )
        .route("/v1/posts/{id}/views", post(engagement::view_post))
        .route("/v1/posts/{id}/likes", get(engagement::likes_for_post))
        .route("/v1/posts/{id}/resync", post(engagement::resync_likes))
        .route("/likePost", post(engagement::like_post))
        .route("/count/{post_id}", get(engagement::like_count))
        .route(
            "/v1/favorites",
            get(crud::list::<Favorite>).post(crud::create::<FavoriteInput>),
        )
        .route("/v1/favorites/toggle", post(engagement::toggle_favorite_handler))
        .route(
            "/v1/favorites/{id}",
            get(crud::get::<Favorite>)
                .put(crud::update::<FavoritePatch>)
                .delete(crud::delete::<Favorite>),
        )
        .route(
            "/v1/categoryRestaurant",
            get(crud::list::<RestaurantCategory>).post(crud::create::<CategoryInput>),
        )
        .route(
            "/v1/categoryRestaurant/{id}",
            get(crud::get::<RestaurantCategory>)
                .put(crud::update::<CategoryPatch>)
                .delete(crud::delete::<RestaurantCategory>),
        )
        .route(
            "/v1/categoryMenu",
            get(crud::list::<MenuCategory>).post(crud::create::<MenuCategoryInput>),
        )
        .route(
            "/v1/categoryMenu/{id}",
            get(crud::get::<MenuCategory>)
                .put(crud::update::<MenuCategoryPatch>)
                .delete(crud::delete::<MenuCategory>),
        )
        .route(
            "/v1/commentRestaurant",
            get(crud::list::<RestaurantComment>).post(crud::create::<RestaurantCommentInput>),
        )
        .route(
            "/v1/commentRestaurant/{id}",
            get(crud::get::<RestaurantComment>)
                .put(crud::update::<RestaurantCommentPatch>)
                .delete(crud::delete::<RestaurantComment>),
        )
        .route(
            "/v1/commentRestaurant/{id}/react",
            post(engagement::react_comment::<RestaurantComment>),
        )
        .route(
            "/v1/commentPost",
            get(crud::list::<PostComment>).post(crud::create::<PostCommentInput>),
        )
        .route(
            "/v1/commentPost/{id}",
            get(crud::get::<PostComment>)
                .put(crud::update::<PostCommentPatch>)
                .delete(crud::delete::<PostComment>),
        )
        .route("/v1/commentPost/{id}/react", post(engagement::react_comment::<PostComment>))
        .route(
            "/v1/commentMenu",
            get(crud::list::<MenuComment>).post(crud::create::<MenuCommentInput>),
        )
        .route(
            "/v1/commentMenu/{id}",
            get(crud::get::<MenuComment>)
                .put(crud::update::<MenuCommentPatch>)
                .delete(crud::delete::<MenuComment>),
        )
        .route("/v1/commentMenu/{id}/react", post(engagement::react_comment::<MenuComment>))
        .with_state(state)
}

pub fn cors(max_age: Duration) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(max_age)
}

/// Serves until Ctrl-C or SIGTERM.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        log::info!("Server running on {address}");
    }
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                log::error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
