//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the mapping
//! from core errors to HTTP status codes used by the handlers.

use axum::http::StatusCode;

use crate::config::ConfigError;
use site_audit_core::{FetchError, GenerationError, PackagingError, PortError, ScoreError};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The error shape every handler returns.
pub type HttpError = (StatusCode, String);

pub fn fetch_error(err: &FetchError) -> HttpError {
    let status = match err {
        FetchError::InvalidUrl(..) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}

pub fn generation_error(err: &GenerationError) -> HttpError {
    (StatusCode::BAD_GATEWAY, err.to_string())
}

pub fn packaging_error(err: &PackagingError) -> HttpError {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

pub fn score_error(err: &ScoreError) -> HttpError {
    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
}

pub fn port_error(err: &PortError) -> HttpError {
    match err {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, what.clone()),
        PortError::Unexpected(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Storage failure".to_string(),
        ),
    }
}
