use axum::extract::State;
use serde_json::Value;

use crate::{
    http::{
        envelope::Envelope,
        error::ApiError,
        extract::{ApiJson, ApiPath},
        state::AppState,
    },
    models::{User, UserPatch, UserProfile},
    workflows::{LoginRequest, catalog::update_user, login},
};

pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Envelope<UserProfile>, ApiError> {
    let profile = login(&state.client, &request).await?;
    Ok(Envelope::ok("Login success", profile))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> Result<Envelope<Value>, ApiError> {
    let user = update_user(&state.client, &id, patch).await?;
    let shown = state.client.collection::<User>().present(&user)?;
    Ok(Envelope::ok("Update users success", shown))
}
