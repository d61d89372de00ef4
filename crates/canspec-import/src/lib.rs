//! Import records, the specification store seam and the import service.
//!
//! The service owns the only shared mutable state besides the store: the
//! compatibility assessment cache. Parsing, diffing and scoring stay pure and
//! run outside any store lock.

pub mod error;
pub mod record;
pub mod service;
pub mod store;

pub use error::{ImportError, Result};
pub use record::{
    ImportId, ImportRecord, ImportState, ImportStatus, SpecId, SpecMetadata, StateTransition,
};
pub use service::{ConsumerImpact, ImportRequest, ImportResult, ImportService, DEFAULT_CONTEXT};
pub use store::{DiffRecord, InMemorySpecStore, SpecStore, StoredSpecification};
