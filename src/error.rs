mod condition;
mod pest;

pub use self::pest::WrappedPestError;
pub use condition::{ConditionError, UnsupportedReason};
pub(crate) use self::pest::positioned_syntax_error;

use crate::engine::MissingTenantError;
use std::env::VarError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(value: E) -> Self {
        Error(Box::new(value.into()))
    }
}

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    /// Errors originating from the Pest library, or positioned the same way
    #[error("Invalid syntax, failed to parse:\n{0}")]
    SyntaxError(#[from] WrappedPestError),
    /// The query parsed, but one of its conditions can't be expressed
    #[error("Unsupported condition:\n{0}")]
    UnsupportedCondition(#[from] ConditionError),
    #[error("{0}")]
    MissingTenant(#[from] MissingTenantError),
    #[error("Internal error:\n{0}")]
    InternalError(#[from] InternalError),
    #[error("Could not find environment variable: \n{0}")]
    EnvVarError(#[from] VarError),
    #[error("IO error:\n{0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error:\n{0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Error reading data from stdin")]
    DialogueError(#[from] dialoguer::Error),
}

pub type PestError = ::pest::error::Error<crate::engine::Rule>;

#[derive(Error, Debug)]
pub struct InternalError(pub String);

impl Display for InternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn into_inner(self) -> ErrorKind {
        *self.0
    }

    /// A single line, without colors. Meant for API responses and editor diagnostics.
    pub fn summary(&self) -> String {
        match self.kind() {
            ErrorKind::SyntaxError(error) => error.summary(),
            ErrorKind::UnsupportedCondition(error) => error.summary(),
            other => other.to_string().replace('\n', " "),
        }
    }

    /// Errors caused by what the user typed, as opposed to errors of the environment we run in.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SyntaxError(_) | ErrorKind::UnsupportedCondition(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_ambient_errors_is_one_line() {
        let error: Error = InternalError("something\nbroke".to_string()).into();

        assert_eq!("Internal error: something broke", error.summary());
        assert!(!error.is_query_error());
    }

    #[test]
    fn test_missing_tenant_summary() {
        let error: Error = MissingTenantError.into();

        assert!(matches!(error.kind(), ErrorKind::MissingTenant(_)));
        assert_eq!(MissingTenantError.to_string(), error.summary());
    }
}
