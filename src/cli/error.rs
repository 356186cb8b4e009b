//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::plaid::PlaidApiError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Application(e) => application_exit_code(e),
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(d) => match d {
            DomainError::ConnectionExists(_) => exitcode::CANTCREAT,
            DomainError::ConnectionNotFound(_) => exitcode::NOINPUT,
            DomainError::InvalidEmail(_)
            | DomainError::InvalidPhone(_)
            | DomainError::InvalidConnectionName(_)
            | DomainError::UnknownEnvironment(_) => exitcode::DATAERR,
        },
        ApplicationError::CredentialsMissing | ApplicationError::AccessTokenMissing { .. } => {
            exitcode::NOINPUT
        }
        ApplicationError::AuthorizationTimedOut { .. } | ApplicationError::MissingPublicToken => {
            exitcode::UNAVAILABLE
        }
        ApplicationError::Plaid {
            source: PlaidApiError::MissingCredentials,
            ..
        } => exitcode::CONFIG,
        ApplicationError::Plaid { .. } => exitcode::UNAVAILABLE,
        ApplicationError::CorruptFile(_) => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::OperationFailed { .. } => exitcode::IOERR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DomainError::ConnectionExists("x".into()).into(), exitcode::CANTCREAT)]
    #[case(DomainError::ConnectionNotFound("x".into()).into(), exitcode::NOINPUT)]
    #[case(DomainError::InvalidPhone("1".into()).into(), exitcode::DATAERR)]
    #[case(ApplicationError::AuthorizationTimedOut { seconds: 1 }.into(), exitcode::UNAVAILABLE)]
    #[case(ApplicationError::plaid("create", PlaidApiError::MissingCredentials).into(), exitcode::CONFIG)]
    #[case(ApplicationError::plaid("create", PlaidApiError::InvalidResponse("x".into())).into(), exitcode::UNAVAILABLE)]
    #[case(ApplicationError::Config { message: "bad".into() }.into(), exitcode::CONFIG)]
    #[case(CliError::Usage("nope".into()), exitcode::USAGE)]
    #[case(InfraError::io("read", std::io::Error::other("boom")).into(), exitcode::IOERR)]
    fn given_error_when_mapping_then_returns_sysexits_code(#[case] err: CliError, #[case] code: i32) {
        assert_eq!(err.exit_code(), code);
    }
}
