//! Canonical model for CAN bus specifications.
//!
//! Parsers for every supported source format produce a [`Specification`];
//! the diff and compatibility crates consume nothing else. The model is
//! immutable once built: a re-import produces a new specification.

pub mod error;
pub mod hash;
pub mod layout;
pub mod model;

pub use error::ModelError;
pub use hash::fingerprint;
pub use layout::{validate_layout, LayoutIssue, LayoutIssueKind, MAX_SIGNAL_BITS};
pub use model::{
    normalize_unit, Message, MessageId, Signal, Specification, SpecificationBuilder,
    DEFAULT_BYTE_LENGTH,
};
