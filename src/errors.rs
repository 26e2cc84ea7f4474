// rdsbackup/src/errors.rs
use thiserror::Error;

/// Fatal errors of a single invocation. Any of these aborts before the first
/// backup attempt is made.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Secret '{secret_id}' unavailable: {message}")]
    SecretUnavailable { secret_id: String, message: String },

    #[error("Secret '{secret_id}' malformed: {reason}")]
    SecretMalformed { secret_id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Transport-level status code reported for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            _ => 500,
        }
    }
}

/// Errors surfaced by a SQL gateway.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    /// The engine (or the connection to it) rejected the command.
    #[error("Database error [{code}]: {message}")]
    Database { code: String, message: String },

    #[error("Unexpected SQL execution error: {0}")]
    Unexpected(String),
}
