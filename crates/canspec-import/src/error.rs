//! Error types for imports and stored specifications.

use canspec_parse::ParseError;

use crate::record::{ImportId, SpecId};

/// Errors from the import service and its store.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("specification {0} not found")]
    SpecNotFound(SpecId),

    #[error("import {0} not found")]
    ImportNotFound(ImportId),

    #[error("invalid state transition from {from} to {to} for import {id}")]
    InvalidTransition {
        id: ImportId,
        from: String,
        to: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot fingerprint specification: {0}")]
    Fingerprint(#[from] serde_json::Error),

    /// Raised by [`SpecStore`](crate::store::SpecStore) backends.
    #[error("storage backend error: {0}")]
    Store(String),
}

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
