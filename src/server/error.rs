//! Error responses.
//!
//! Every failure carries a `{"detail": "..."}` body, the shape the frontend
//! already handles. Upstream failures map to `500`; malformed request bodies
//! keep the status axum assigns them (400, 415 or 422).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::upstream::UpstreamError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Chat(#[from] UpstreamError),

    #[error("Error scoring reasoning: {0}")]
    Scoring(#[source] UpstreamError),

    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Chat(_) | ApiError::Scoring(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidBody { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
