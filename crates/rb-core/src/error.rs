//! # AppError
//!
//! Centralized error handling for the Rusty-Blog ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all rb-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Post, Comment, User)
    #[error("{0} not found!")]
    NotFound(String),

    /// Validation failure (e.g., blank title, unknown category, bad signature)
    #[error("{0}")]
    ValidationError(String),

    /// No verified caller
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is known but may not touch the resource
    #[error("{0}")]
    Forbidden(String),

    /// Infrastructure failure (e.g., DB down, missing media keys)
    #[error("{0}")]
    Internal(String),

    /// Resource already exists (e.g., slug taken by a concurrent insert)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Recovers an `AppError` that an adapter stored inside an `anyhow::Error`.
    /// Anything else is an infrastructure failure.
    pub fn from_port(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Internal(format!("{other:#}")),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::from_port(err)
    }
}

/// A specialized Result type for Rusty-Blog logic.
pub type Result<T> = std::result::Result<T, AppError>;
