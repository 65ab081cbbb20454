use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::search::Pagination;

/// Success body: `{statusCode, message, data}`, status mirrored in the header.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(skip)]
    status: StatusCode,
    status_code: u16,
    message: String,
    data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status,
            status_code: status.as_u16(),
            message: message.into(),
            data,
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, data)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// List payload: `{<collection>: [...], pagination: {...}}`.
pub fn list_data(collection: &str, items: Vec<Value>, pagination: Pagination) -> Value {
    let mut data = Map::new();
    data.insert(collection.to_string(), Value::Array(items));
    data.insert(
        "pagination".to_string(),
        serde_json::to_value(pagination).unwrap_or(Value::Null),
    );
    Value::Object(data)
}
