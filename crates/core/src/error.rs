//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic failures only (request validation).
/// IO and model fitting failures belong to their own crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request token did not match any supported literal.
    #[error("unsupported token: {0:?}")]
    UnsupportedToken(String),
}

impl DomainError {
    pub fn unsupported(token: impl Into<String>) -> Self {
        Self::UnsupportedToken(token.into())
    }
}
