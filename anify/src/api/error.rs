//! Error responses of the HTTP API
//!
//! Every error body has the shape `{"message": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::search::MissingField;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", .0.message())]
    MissingField(MissingField),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Details stay in the server log; clients only see that the backend failed
    #[error("Search backend unavailable.")]
    Upstream(#[from] crate::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<MissingField> for ApiError {
    fn from(field: MissingField) -> Self {
        ApiError::MissingField(field)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            message: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
