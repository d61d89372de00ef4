//! Error types for the canonical model.

/// Errors raised while building canonical model values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid message id '{0}': expected 0x-prefixed hex or decimal")]
    InvalidMessageId(String),
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
