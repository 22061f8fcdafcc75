use thiserror::Error;

/// Failure taxonomy for the core operations.
///
/// Soft outcomes (a wrong password, a wrong recovery answer, a block-set push
/// that could not reach the enforcement channel) are ordinary return values,
/// not errors. Everything here is surfaced to the caller and never retried
/// by the core itself.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input, e.g. a password below the minimum length.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Wrong current password on a password change.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// An operation that requires setup the user skipped, e.g. recovery
    /// without a configured security question.
    #[error("not configured: {0}")]
    Configuration(String),

    /// Storage or channel I/O failure, propagated as-is.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        CoreError::Auth(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        CoreError::Configuration(msg.into())
    }
}
