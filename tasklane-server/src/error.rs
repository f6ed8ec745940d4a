//! Error types for tasklane-server
//!
//! [`AppError`] is the only vocabulary services use to report failure.
//! The HTTP layer turns it into an error envelope in
//! [`crate::http::error`].

use axum::http::StatusCode;
use thiserror::Error;

/// Boxed underlying cause of an internal error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type AppResult<T> = Result<T, AppError>;

/// Classified service failure
#[derive(Error, Debug)]
pub enum AppError {
    /// Identifier does not resolve (404)
    #[error("{message}: not found")]
    NotFound { message: String },

    /// Malformed or empty input (400)
    #[error("{message}: bad request")]
    BadRequest { message: String },

    /// Uniqueness violation (409)
    #[error("{message}: conflict")]
    Conflict { message: String },

    /// Unexpected store or infrastructure failure (500)
    #[error("Internal server error: {source}")]
    Internal {
        #[source]
        source: BoxError,
    },
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(source: impl Into<BoxError>) -> Self {
        Self::Internal {
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message for the envelope's `message` field.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message }
            | Self::BadRequest { message }
            | Self::Conflict { message } => message,
            Self::Internal { .. } => "Internal server error",
        }
    }

    /// Underlying cause text for the envelope's `error` field.
    pub fn detail(&self) -> String {
        match self {
            Self::NotFound { .. } => "not found".to_owned(),
            Self::BadRequest { .. } => "bad request".to_owned(),
            Self::Conflict { .. } => "conflict".to_owned(),
            Self::Internal { source } => source.to_string(),
        }
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(e: crate::db::DbError) -> Self {
        Self::internal(e)
    }
}

/// Startup and serving failures
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}
