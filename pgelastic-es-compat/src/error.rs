//! Error types for the HTTP layer

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pgelastic::response::ErrorResponse;

/// Errors surfaced by the Elasticsearch-compatible endpoints
#[derive(Debug, thiserror::Error)]
pub enum EsCompatError {
    #[error(transparent)]
    Store(#[from] pgelastic::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("Request body exceeds {0}")]
    PayloadTooLarge(String),
}

impl EsCompatError {
    fn error_type(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_type(),
            Self::NotFound(_) => "resource_not_found_exception",
            Self::PayloadTooLarge(_) => "content_too_long_exception",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn reason(&self) -> String {
        match self {
            Self::Store(e) => e.reason().to_string(),
            other => other.to_string(),
        }
    }
}

impl From<BytesRejection> for EsCompatError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::Store(pgelastic::Error::TransportIo(rejection.body_text()))
        }
    }
}

impl IntoResponse for EsCompatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Store(e) => ErrorResponse::from(e),
            other => ErrorResponse::new(other.error_type(), other.reason(), status.as_u16()),
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", body.error.error_type, body.error.reason);
        }

        (status, axum::Json(body)).into_response()
    }
}
