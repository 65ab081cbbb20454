use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::RepoError;

/// The one place store errors and extractor rejections become responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Repo(err) => match err {
                RepoError::Validation(_) | RepoError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                RepoError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
                RepoError::NotFound { .. } => StatusCode::NOT_FOUND,
                RepoError::UniqueConstraintViolation { .. } | RepoError::Restricted { .. } => StatusCode::CONFLICT,
                RepoError::Redis(_) | RepoError::Other { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

macro_rules! rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

rejection!(JsonRejection, PathRejection, QueryRejection);
