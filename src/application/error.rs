//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::plaid::PlaidApiError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("user credentials not set up (run: ttyf user --setup)")]
    CredentialsMissing,

    #[error("access token for {item_id} not found in secure storage")]
    AccessTokenMissing { item_id: String },

    #[error("authorization timed out after {seconds}s, please try again")]
    AuthorizationTimedOut { seconds: u64 },

    #[error("no public token received, please try again")]
    MissingPublicToken,

    #[error("{context}: {source}")]
    Plaid {
        context: String,
        #[source]
        source: PlaidApiError,
    },

    #[error("corrupt data file: {0}")]
    CorruptFile(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn plaid(context: impl Into<String>, source: PlaidApiError) -> Self {
        Self::Plaid {
            context: context.into(),
            source,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
