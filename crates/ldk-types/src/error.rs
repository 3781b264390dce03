use thiserror::Error;

/// Errors raised while parsing or resolving foundation types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The input could not be understood as a location.
    #[error("invalid location {input:?}: {reason}")]
    InvalidLocation { input: String, reason: String },

    /// A relative location was given without a base to resolve it against.
    #[error("cannot resolve relative location {0:?}: current directory unavailable")]
    NoBaseDirectory(String),
}

impl TypeError {
    pub(crate) fn invalid(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for foundation type operations.
pub type TypeResult<T> = Result<T, TypeError>;
