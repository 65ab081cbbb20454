use axum::extract::State;
use serde_json::{Value, json};

use crate::{
    http::{
        envelope::Envelope,
        error::ApiError,
        extract::{ApiJson, ApiPath},
        state::AppState,
    },
    models::ReactionInput,
    types::Entity,
    workflows::{
        CounterSynchronizer, FavoriteRequest, FavoriteToggle, LikeRegister, LikeRequest, LikeToggle,
        engagement::{react, record_view, toggle_favorite},
    },
};

pub async fn like_post(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LikeRequest>,
) -> Result<Envelope<LikeToggle>, ApiError> {
    let toggled = LikeRegister::new(state.client)
        .toggle(&request.post_id, &request.user_id)
        .await?;
    Ok(Envelope::ok("Toggle like success", toggled))
}

pub async fn like_count(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<String>,
) -> Result<Envelope<Value>, ApiError> {
    let count = LikeRegister::new(state.client).count_for_post(&post_id).await?;
    Ok(Envelope::ok(
        "Get like count success",
        json!({"post_id": post_id, "like_count": count}),
    ))
}

pub async fn likes_for_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<String>,
) -> Result<Envelope<Vec<Value>>, ApiError> {
    let likes = LikeRegister::new(state.client).list_for_post(&post_id).await?;
    Ok(Envelope::ok("Get post likes success", likes))
}

pub async fn likes_for_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Envelope<Vec<Value>>, ApiError> {
    let likes = LikeRegister::new(state.client).list_for_user(&user_id).await?;
    Ok(Envelope::ok("Get user likes success", likes))
}

pub async fn resync_likes(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<String>,
) -> Result<Envelope<Value>, ApiError> {
    let count = CounterSynchronizer::new(state.client).resync(&post_id).await?;
    Ok(Envelope::ok(
        "Resync like count success",
        json!({"post_id": post_id, "like_count": count}),
    ))
}

pub async fn view_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<String>,
) -> Result<Envelope<Value>, ApiError> {
    let views = record_view(&state.client, &post_id).await?;
    Ok(Envelope::ok(
        "Record view success",
        json!({"post_id": post_id, "view_count": views}),
    ))
}

pub async fn toggle_favorite_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FavoriteRequest>,
) -> Result<Envelope<FavoriteToggle>, ApiError> {
    let toggled = toggle_favorite(&state.client, &request.user_id, &request.restaurant_id).await?;
    Ok(Envelope::ok("Toggle favorite success", toggled))
}

pub async fn react_comment<T: Entity>(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<String>,
    ApiJson(input): ApiJson<ReactionInput>,
) -> Result<Envelope<Value>, ApiError> {
    let comment = react::<T>(&state.client, &comment_id, input.reaction).await?;
    let shown = state.client.collection::<T>().present(&comment)?;
    Ok(Envelope::ok("React to comment success", shown))
}
