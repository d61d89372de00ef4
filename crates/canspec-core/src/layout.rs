//! Structural validation of message payload layouts.
//!
//! Source specifications frequently violate their own layout rules, so
//! validation reports issues instead of rejecting the specification.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{MessageId, Specification};

/// Widest raw value a signal may carry.
pub const MAX_SIGNAL_BITS: u16 = 64;

/// What kind of layout rule a signal or message breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutIssueKind {
    /// `start_bit + bit_length` runs past the declared payload.
    ExceedsPayload,
    /// A signal with zero bits.
    ZeroLength,
    /// A signal wider than [`MAX_SIGNAL_BITS`].
    TooWide,
    /// Two signals in one message share a name.
    DuplicateName,
}

/// A layout problem found in a specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutIssue {
    pub kind: LayoutIssueKind,
    pub message_id: MessageId,
    pub signal_name: String,
    pub message: String,
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.message_id, self.signal_name, self.message)
    }
}

/// Check every signal of every message against the layout rules.
///
/// Returns an empty list when the specification is clean.
pub fn validate_layout(spec: &Specification) -> Vec<LayoutIssue> {
    let mut issues = Vec::new();

    for message in spec.messages() {
        let capacity = message.bit_capacity();
        let mut seen = HashSet::new();

        for signal in &message.signals {
            let mut push = |kind, text: String| {
                issues.push(LayoutIssue {
                    kind,
                    message_id: message.id,
                    signal_name: signal.name.clone(),
                    message: text,
                })
            };

            if signal.bit_length == 0 {
                push(LayoutIssueKind::ZeroLength, "signal has zero bit length".into());
            } else if signal.bit_length > MAX_SIGNAL_BITS {
                push(
                    LayoutIssueKind::TooWide,
                    format!(
                        "bit length {} exceeds {MAX_SIGNAL_BITS} bits",
                        signal.bit_length
                    ),
                );
            }

            if signal.end_bit() > capacity {
                push(
                    LayoutIssueKind::ExceedsPayload,
                    format!(
                        "bits {}..{} exceed the {}-byte payload ({capacity} bits)",
                        signal.start_bit,
                        signal.end_bit(),
                        message.byte_length
                    ),
                );
            }

            if !seen.insert(signal.name.as_str()) {
                push(
                    LayoutIssueKind::DuplicateName,
                    "signal name appears more than once in this message".into(),
                );
            }
        }
    }

    issues
}
