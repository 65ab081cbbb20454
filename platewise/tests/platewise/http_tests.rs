use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use platewise::http::{AppState, router};
use tower::ServiceExt;

use super::support::*;

fn app(client: &Client) -> Router {
    router(AppState::new(client.clone()))
}

async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn like_post_toggles_and_counts() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Via HTTP").await;
    let request = json!({"post_id": post.id, "user_id": author.id});

    let (status, body) = call(app(&client), Method::POST, "/likePost", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["data"]["action"], "liked");
    assert_eq!(body["data"]["like_count"], 1);
    assert_eq!(body["data"]["like"]["post_id"], json!(post.id));

    let (status, body) = call(app(&client), Method::GET, &format!("/count/{}", post.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["like_count"], 1);

    let (_, body) = call(app(&client), Method::POST, "/likePost", Some(request)).await;
    assert_eq!(body["data"]["action"], "unliked");
    assert_eq!(body["data"]["like_count"], 0);
    assert_eq!(body["data"]["like"], Value::Null);
}

#[tokio::test]
async fn like_post_reports_missing_post() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;

    let (status, body) = call(
        app(&client),
        Method::POST,
        "/likePost",
        Some(json!({"post_id": "noSuchPost", "user_id": author.id})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
    assert!(body["message"].as_str().unwrap().contains("noSuchPost"));

    let (status, _) = call(app(&client), Method::GET, "/count/noSuchPost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let client = memory_client();
    let (status, body) = call(app(&client), Method::POST, "/likePost", Some(json!({"post_id": 7}))).await;
    assert!(status.is_client_error());
    assert_eq!(body["statusCode"], status.as_u16());
}

#[tokio::test]
async fn user_lifecycle_over_http() {
    let client = memory_client();
    let app = app(&client);

    let (status, body) = call(
        app.clone(),
        Method::POST,
        "/v1/users",
        Some(json!({"username": "carol", "email": "carol@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["statusCode"], 201);
    assert!(body["data"].get("password_hash").is_none());
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        app.clone(),
        Method::POST,
        "/v1/users",
        Some(json!({"username": "Carol", "email": "carol2@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        app.clone(),
        Method::PUT,
        &format!("/v1/users/{id}"),
        Some(json!({"full_name": "Carol C."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["full_name"], "Carol C.");
    assert_eq!(body["data"]["email"], "carol@example.com");

    let (status, body) = call(
        app.clone(),
        Method::POST,
        "/v1/auth/login",
        Some(json!({"identifier": "carol", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(id));

    let (status, _) = call(
        app.clone(),
        Method::POST,
        "/v1/auth/login",
        Some(json!({"identifier": "carol", "password": "wrong password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(app.clone(), Method::DELETE, &format!("/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(app, Method::GET, &format!("/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
}

#[tokio::test]
async fn list_wraps_items_with_pagination() {
    let client = memory_client();
    for name in ["Thai", "Korean", "Mexican"] {
        seed_category(&client, name).await;
    }

    let (status, body) = call(
        app(&client),
        Method::GET,
        "/v1/categoryRestaurant?page=1&limit=2&sort_by=name&sort_type=asc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["restaurant_categories"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Korean");
    assert_eq!(body["data"]["pagination"], json!({"totalRecord": 3, "limit": 2, "page": 1}));

    let (status, _) = call(app(&client), Method::GET, "/v1/categoryRestaurant?sort_by=color", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn restaurant_routes_enforce_owner_and_restrict() {
    let client = memory_client();
    let (owner, category, restaurant) = seed_catalog(&client).await;
    let diner = seed_user(&client, "diner", Role::Customer).await;

    let (status, body) = call(
        app(&client),
        Method::POST,
        "/v1/restaurants",
        Some(json!({
            "owner_id": diner.id,
            "category_id": category.id,
            "name": "Not Allowed",
            "address": "2 Side Street",
            "phone": "555 0142",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);

    let (status, body) = call(app(&client), Method::GET, &format!("/v1/restaurants/{}", restaurant.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner"]["username"], "owner");
    assert_eq!(body["data"]["category"]["name"], "Noodles");

    let (status, _) = call(app(&client), Method::DELETE, &format!("/v1/users/{}", owner.id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        app(&client),
        Method::PUT,
        &format!("/v1/users/{}", owner.id),
        Some(json!({"role": "customer"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
}

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() {
    let client = memory_client();
    seed_category(&client, "Thai").await;

    let (status, body) = call(
        app(&client),
        Method::GET,
        "/v1/categoryRestaurant?page=18446744073709551615&limit=10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["restaurant_categories"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["pagination"]["totalRecord"], 1);
}

#[tokio::test]
async fn comment_reactions_and_views() {
    let client = memory_client();
    let author = seed_user(&client, "author", Role::Customer).await;
    let post = seed_post(&client, &author, "Reactions").await;
    let comment = comment_on(&client, &author, &post, "hmm").await;

    let (status, body) = call(
        app(&client),
        Method::POST,
        &format!("/v1/commentPost/{}/react", comment.id),
        Some(json!({"reaction": "dislike"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dislike_count"], 1);
    assert_eq!(body["data"]["like_count"], 0);

    let (status, body) = call(app(&client), Method::POST, &format!("/v1/posts/{}/views", post.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["view_count"], 1);
}
