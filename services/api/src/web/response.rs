//! services/api/src/web/response.rs
//!
//! The JSON error body returned by every REST handler, and the conversions
//! from core error types into it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dormduty_core::{
    booking::BookingError,
    ledger::{LedgerError, SplitError},
    ports::PortError,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Body of every non-2xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// A handler failure carrying the status code and the message for the client.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl From<PortError> for HttpError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            PortError::Invalid(msg) => Self::bad_request(msg),
            PortError::Forbidden(msg) => Self::forbidden(msg),
            PortError::Conflict(msg) => Self::conflict(msg),
            PortError::Unauthorized => Self::new(StatusCode::UNAUTHORIZED, "Unauthorized"),
            PortError::Unexpected(msg) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl From<LedgerError> for HttpError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownExpense(_) | LedgerError::UnknownPayment(_) => {
                Self::new(StatusCode::NOT_FOUND, err.to_string())
            }
            LedgerError::OutstandingBalance(..) => Self::conflict(err.to_string()),
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl From<SplitError> for HttpError {
    fn from(err: SplitError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<BookingError> for HttpError {
    fn from(err: BookingError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        } else if self.status == StatusCode::FORBIDDEN {
            warn!("Rejected cross-room access: {}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
