//! Error type for the HTTP layer.
//!
//! [`ApiError`] wraps broker and dataset failures and maps them onto status
//! codes: caller mistakes become 4xx, everything else 500.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::utils::error::{BrokerError, DatasetError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Broker(BrokerError::Validation(_) | BrokerError::InvalidRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Broker(BrokerError::UnknownSubscription(_)) => StatusCode::NOT_FOUND,
            Self::Dataset(DatasetError::IndexOutOfRange { .. }) => StatusCode::NOT_FOUND,
            Self::Dataset(DatasetError::InvalidBatch { .. }) => StatusCode::BAD_REQUEST,
            Self::Dataset(DatasetError::Io(_) | DatasetError::Parse(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "status": "error",
            "detail": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
