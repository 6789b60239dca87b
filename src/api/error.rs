use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}

/// Failures a handler can return.
///
/// Validation failures carry a client-facing message. Storage failures are
/// mapped by kind; a service error's cause is logged and replaced by a fixed
/// message.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(StorageError::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => {
                tracing::info!(status = status.as_u16(), "{}", msg);
                msg
            }
            ApiError::Storage(err @ StorageError::Duplicate(_)) => {
                tracing::warn!(error = %err, "Rejected duplicate feed");
                "RSS URL feed already exists in the database".to_string()
            }
            ApiError::Storage(err @ StorageError::NotFound(_)) => {
                tracing::warn!(error = %err, "Feed lookup missed");
                "URL not found".to_string()
            }
            ApiError::Storage(err) => {
                tracing::error!(error = %err, "Storage failure while serving request");
                "Internal error".to_string()
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}
