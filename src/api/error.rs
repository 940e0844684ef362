use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AccountError, CertificateError, RosterError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    ValidationError(String),

    /// Duplicate certificate / duplicate registration. Served as 400, the
    /// way the public clients of this API expect it.
    Conflict(String),

    /// A requirement on existing state is unmet (e.g. wallet not bound).
    PreconditionFailed(String),

    /// Ledger or mail transport failed; the client's message is passed
    /// through so operators can see the upstream cause.
    UpstreamError { service: String, message: String },

    DatabaseError(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::PreconditionFailed(msg) => write!(f, "Precondition failed: {}", msg),
            ApiError::UpstreamError { service, message } => {
                write!(f, "{} error: {}", service, message)
            }
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ValidationError(msg)
            | ApiError::Conflict(msg)
            | ApiError::PreconditionFailed(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::UpstreamError { service, message } => {
                tracing::error!("{} failure: {}", service, message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<CertificateError> for ApiError {
    fn from(err: CertificateError) -> Self {
        match err {
            CertificateError::Validation(_) => ApiError::ValidationError(err.to_string()),
            CertificateError::StudentNotFound
            | CertificateError::EventNotFound
            | CertificateError::CertificateNotFound => ApiError::NotFound(err.to_string()),
            CertificateError::WalletNotBound(_) => {
                ApiError::PreconditionFailed(err.to_string())
            }
            CertificateError::AlreadyIssued => ApiError::Conflict(err.to_string()),
            CertificateError::Ledger(e) => ApiError::UpstreamError {
                service: "Ledger".to_string(),
                message: e.to_string(),
            },
            CertificateError::Database(msg) => ApiError::DatabaseError(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AccountError::Validation(_) | AccountError::InvalidToken => {
                ApiError::ValidationError(err.to_string())
            }
            AccountError::NotFound(msg) => ApiError::NotFound(msg),
            AccountError::Mail(e) => ApiError::UpstreamError {
                service: "Mail".to_string(),
                message: e.to_string(),
            },
            AccountError::Database(msg) => ApiError::DatabaseError(msg),
        }
    }
}

impl From<RosterError> for ApiError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Parse(msg) => {
                ApiError::ValidationError(format!("Error parsing CSV file: {msg}"))
            }
            RosterError::Database(msg) => ApiError::DatabaseError(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
