//! Restaurant writes go through the owner-role check.

use axum::extract::State;
use serde_json::Value;

use crate::{
    http::{
        envelope::Envelope,
        error::ApiError,
        extract::{ApiJson, ApiPath},
        state::AppState,
    },
    models::{Restaurant, RestaurantInput, RestaurantPatch},
    workflows::catalog::{create_restaurant, update_restaurant},
};

pub async fn create_restaurant_handler(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RestaurantInput>,
) -> Result<Envelope<Value>, ApiError> {
    let restaurant = create_restaurant(&state.client, input).await?;
    let shown = state.client.collection::<Restaurant>().present(&restaurant)?;
    Ok(Envelope::created("Create restaurants success", shown))
}

pub async fn update_restaurant_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<RestaurantPatch>,
) -> Result<Envelope<Value>, ApiError> {
    let restaurant = update_restaurant(&state.client, &id, patch).await?;
    let shown = state.client.collection::<Restaurant>().present(&restaurant)?;
    Ok(Envelope::ok("Update restaurants success", shown))
}
