//! Import records and their state machine.
//!
//! An import moves `Pending → Parsing → Completed | Failed`. Both outcomes
//! are terminal. Every transition is appended to the record's history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use canspec_parse::SpecFormat;

use crate::error::{ImportError, Result};

/// Unique identifier for a stored specification.
pub type SpecId = Uuid;

/// Unique identifier for an import attempt.
pub type ImportId = Uuid;

/// Where an import stands, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportStatus {
    Pending,
    Parsing,
    Completed,
    Failed,
}

impl ImportStatus {
    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> &'static [ImportStatus] {
        use ImportStatus::*;
        match self {
            Pending => &[Parsing],
            Parsing => &[Completed, Failed],
            Completed | Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: ImportStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStatus::Pending => write!(f, "PENDING"),
            ImportStatus::Parsing => write!(f, "PARSING"),
            ImportStatus::Completed => write!(f, "COMPLETED"),
            ImportStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Import state with the data each outcome carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ImportState {
    Pending,
    Parsing,
    #[serde(rename_all = "camelCase")]
    Completed {
        spec_id: SpecId,
        baseline_id: Option<SpecId>,
    },
    Failed {
        reason: String,
    },
}

impl ImportState {
    pub fn status(&self) -> ImportStatus {
        match self {
            ImportState::Pending => ImportStatus::Pending,
            ImportState::Parsing => ImportStatus::Parsing,
            ImportState::Completed { .. } => ImportStatus::Completed,
            ImportState::Failed { .. } => ImportStatus::Failed,
        }
    }
}

/// Caller-supplied description of an imported source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecMetadata {
    pub source_name: String,
    /// Format tag as given by the caller.
    pub format: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl SpecMetadata {
    pub fn new(source_name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            format: format.into(),
            version: None,
            description: None,
        }
    }

    /// The parsed format, when the tag is recognized.
    pub fn spec_format(&self) -> Option<SpecFormat> {
        self.format.parse().ok()
    }
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    pub from: ImportStatus,
    pub to: ImportStatus,
    /// Monotonically increasing per record, starting at 1.
    pub sequence: u64,
    pub at: DateTime<Utc>,
}

/// One import attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: ImportId,
    pub metadata: SpecMetadata,
    pub state: ImportState,
    pub history: Vec<StateTransition>,
    pub created_at: DateTime<Utc>,
}

impl ImportRecord {
    /// A new record in `Pending`.
    pub fn new(metadata: SpecMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
            state: ImportState::Pending,
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> ImportStatus {
        self.state.status()
    }

    /// Move to `next`, recording the transition.
    pub fn transition(&mut self, next: ImportState) -> Result<()> {
        let from = self.status();
        let to = next.status();
        if !from.can_transition_to(to) {
            return Err(ImportError::InvalidTransition {
                id: self.id,
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.history.push(StateTransition {
            from,
            to,
            sequence: self.history.len() as u64 + 1,
            at: Utc::now(),
        });
        self.state = next;
        Ok(())
    }

    pub fn start_parsing(&mut self) -> Result<()> {
        self.transition(ImportState::Parsing)
    }

    pub fn complete(&mut self, spec_id: SpecId, baseline_id: Option<SpecId>) -> Result<()> {
        self.transition(ImportState::Completed {
            spec_id,
            baseline_id,
        })
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(ImportState::Failed {
            reason: reason.into(),
        })
    }

    /// The stored specification id once completed.
    pub fn spec_id(&self) -> Option<SpecId> {
        match &self.state {
            ImportState::Completed { spec_id, .. } => Some(*spec_id),
            _ => None,
        }
    }
}
