//! Policy error types.

use thiserror::Error;

/// Errors raised by identifiers, fact stores and policy evaluators.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid {kind} identifier: {reason}")]
    InvalidIdentifier { kind: &'static str, reason: String },

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("policy service unavailable: {0}")]
    Unavailable(String),

    #[error("policy service rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed policy service response: {0}")]
    Decode(String),
}

impl PolicyError {
    /// True when the error came from the fact store or evaluator backend
    /// rather than from the caller's input.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Rejected { .. } | Self::Decode(_)
        )
    }
}
