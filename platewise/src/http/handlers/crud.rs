//! Handlers shared by every collection, instantiated per entity in the router.

use axum::extract::State;
use serde_json::Value;

use crate::{
    http::{
        envelope::{Envelope, list_data},
        error::ApiError,
        extract::{ApiJson, ApiPath, ApiQuery},
        state::AppState,
    },
    repository::{CreateInput, PatchInput},
    search::ListQuery,
    types::Entity,
};

fn collection<T: Entity>() -> &'static str {
    T::descriptor().collection
}

pub async fn list<T: Entity>(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery,
) -> Result<Envelope<Value>, ApiError> {
    let handle = state.client.collection::<T>();
    let page = handle.list(ListQuery::from_params(params)?).await?;
    let pagination = page.pagination();
    let items = page
        .items
        .iter()
        .map(|item| handle.present(item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Envelope::ok(
        format!("Get {} success", collection::<T>()),
        list_data(collection::<T>(), items, pagination),
    ))
}

pub async fn get<T: Entity>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Envelope<Value>, ApiError> {
    let document = state.client.collection::<T>().get_populated(&id).await?;
    Ok(Envelope::ok(format!("Get {} success", collection::<T>()), document))
}

pub async fn create<I: CreateInput>(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<I>,
) -> Result<Envelope<Value>, ApiError> {
    let handle = state.client.collection::<I::Entity>();
    let created = handle.create(input).await?;
    Ok(Envelope::created(
        format!("Create {} success", collection::<I::Entity>()),
        handle.present(&created)?,
    ))
}

pub async fn update<P: PatchInput>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<P>,
) -> Result<Envelope<Value>, ApiError> {
    let handle = state.client.collection::<P::Entity>();
    let updated = handle.update(&id, patch).await?;
    Ok(Envelope::ok(
        format!("Update {} success", collection::<P::Entity>()),
        handle.present(&updated)?,
    ))
}

pub async fn delete<T: Entity>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Envelope<Value>, ApiError> {
    let handle = state.client.collection::<T>();
    let deleted = handle.delete(&id).await?;
    Ok(Envelope::ok(
        format!("Delete {} success", collection::<T>()),
        handle.present(&deleted)?,
    ))
}
