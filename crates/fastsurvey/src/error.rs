//! Service error types.

use fastsurvey_db::DbError;
use fastsurvey_schema::{ConfigurationError, Violations};
use thiserror::Error;

/// Errors raised by survey operations.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// The survey configuration does not compile. The survey is not registered.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The submission broke one or more field constraints. Nothing was stored.
    #[error("Submission rejected: {0}")]
    Validation(#[from] Violations),

    /// No pending entry of this survey carries the token. Nothing was stored.
    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Unknown survey: {0}")]
    UnknownSurvey(String),

    #[error("Storage error: {0}")]
    Store(#[from] DbError),
}

impl SurveyError {
    /// Violations of a rejected submission, if this is a validation failure.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            SurveyError::Validation(violations) => Some(violations),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SurveyError>;
