use thiserror::Error;

/// Outcome of a rejected service call. None of these is fatal: the caller
/// decides how to report each kind.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// The resource is absent or belongs to someone else; the two are not told apart.
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// Storage or crypto failure; details are logged, never shown to callers.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation(errors)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_joined() {
        let err = DomainError::validation(vec![
            "Title cannot be empty".into(),
            "Description cannot exceed 1000 characters".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Title cannot be empty; Description cannot exceed 1000 characters"
        );
    }

    #[test]
    fn storage_errors_convert() {
        let err: DomainError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, DomainError::Internal(_)));
        assert_eq!(err.to_string(), "internal error: disk full");
    }
}
