//! Handler error type rendered as a JSON `{ error }` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::repo::RepoError;
use crate::routes::ErrorResponse;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Repo(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(StorageError::NotFound(_) | StorageError::InvalidKey) => {
                StatusCode::NOT_FOUND
            }
            AppError::Storage(StorageError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error, message: None })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
