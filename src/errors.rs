//! Unified application error type.
//! Every layer (store, sync, core, cli) returns AppError so the CLI can
//! tell a transient network problem apart from a rejected credential or a
//! validation failure.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO / serialization
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Local security
    // ---------------------------
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// A stored record failed verification or decryption.
    #[error("Integrity check failed for record {0}")]
    Integrity(String),

    // ---------------------------
    // Remote authority
    // ---------------------------
    /// Remote unreachable or transient non-2xx answer. Callers queue and retry.
    #[error("Network error: {0}")]
    Network(String),

    /// Remote explicitly rejected the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    // ---------------------------
    // Input validation (never queued)
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid punch method: {0}")]
    InvalidMethod(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Unsynced data is older than the offline threshold.
    #[error("Offline actions locked: {0}")]
    Locked(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration")]
    ConfigLoad,

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// Errors that mean "try again later" rather than "this input is wrong".
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(s) if s.as_u16() == 401 || s.as_u16() == 403 => AppError::Auth(e.to_string()),
            _ => AppError::Network(e.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
