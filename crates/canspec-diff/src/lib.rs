//! Structural diffs between two canonical CAN specifications.
//!
//! [`diff`] walks both specifications message by message and signal by
//! signal and emits one [`Diff`] per changed entity or attribute, each with
//! a [`ChangeCategory`], a [`Severity`] and, when the transmitter resolves
//! through the [`SubsystemMap`], the impacted subsystem.

pub mod engine;
pub mod error;
pub mod policy;
pub mod subsystem;
pub mod summary;
pub mod types;

pub use engine::{diff, diff_specs};
pub use error::{ConfigError, Result};
pub use policy::{DiffConfig, SeverityPolicy};
pub use subsystem::SubsystemMap;
pub use summary::{render_text, summarize, DiffSummary};
pub use types::{ChangeCategory, ChangeType, Diff, EntityType, Severity};
