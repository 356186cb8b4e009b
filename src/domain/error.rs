//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent business rule violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("invalid phone number: {0:?} (expected exactly 10 digits)")]
    InvalidPhone(String),

    #[error("invalid connection name: {0:?}")]
    InvalidConnectionName(String),

    #[error("connection with name '{0}' already exists")]
    ConnectionExists(String),

    #[error("connection with name '{0}' not found")]
    ConnectionNotFound(String),

    #[error("unknown Plaid environment: {0}")]
    UnknownEnvironment(String),
}
