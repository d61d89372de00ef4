//! Diff summaries and text rendering.

use serde::{Deserialize, Serialize};

use crate::types::{ChangeType, Diff, EntityType, Severity};

/// Counts over a list of diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub total_changes: usize,
    pub message_added_count: usize,
    pub message_removed_count: usize,
    pub message_modified_count: usize,
    pub signal_added_count: usize,
    pub signal_removed_count: usize,
    pub signal_modified_count: usize,
    pub severity_critical_count: usize,
    pub severity_high_count: usize,
    pub severity_medium_count: usize,
    pub severity_low_count: usize,
    pub severity_informational_count: usize,
    /// Distinct subsystems in first-seen order.
    pub impacted_subsystems: Vec<String>,
    pub summary_text: String,
}

impl DiffSummary {
    /// Number of diffs at `severity`.
    pub fn severity_count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.severity_critical_count,
            Severity::High => self.severity_high_count,
            Severity::Medium => self.severity_medium_count,
            Severity::Low => self.severity_low_count,
            Severity::Informational => self.severity_informational_count,
        }
    }
}

/// Count diffs by change type, entity type, severity and subsystem.
pub fn summarize(diffs: &[Diff]) -> DiffSummary {
    let mut summary = DiffSummary {
        total_changes: diffs.len(),
        ..DiffSummary::default()
    };

    for diff in diffs {
        let counter = match (diff.entity_type, diff.change_type) {
            (EntityType::Message, ChangeType::Added) => &mut summary.message_added_count,
            (EntityType::Message, ChangeType::Removed) => &mut summary.message_removed_count,
            (EntityType::Message, ChangeType::Modified) => &mut summary.message_modified_count,
            (EntityType::Signal, ChangeType::Added) => &mut summary.signal_added_count,
            (EntityType::Signal, ChangeType::Removed) => &mut summary.signal_removed_count,
            (EntityType::Signal, ChangeType::Modified) => &mut summary.signal_modified_count,
        };
        *counter += 1;

        let counter = match diff.severity {
            Severity::Critical => &mut summary.severity_critical_count,
            Severity::High => &mut summary.severity_high_count,
            Severity::Medium => &mut summary.severity_medium_count,
            Severity::Low => &mut summary.severity_low_count,
            Severity::Informational => &mut summary.severity_informational_count,
        };
        *counter += 1;

        if let Some(subsystem) = diff.impacted_subsystem.as_deref() {
            if !subsystem.is_empty() && !summary.impacted_subsystems.iter().any(|s| s == subsystem)
            {
                summary.impacted_subsystems.push(subsystem.to_string());
            }
        }
    }

    summary.summary_text = summary_text(&summary);
    summary
}

fn summary_text(s: &DiffSummary) -> String {
    if s.total_changes == 0 {
        return "No changes".to_string();
    }

    let mut text = format!(
        "{} change(s): messages +{} -{} ~{}, signals +{} -{} ~{}",
        s.total_changes,
        s.message_added_count,
        s.message_removed_count,
        s.message_modified_count,
        s.signal_added_count,
        s.signal_removed_count,
        s.signal_modified_count,
    );

    let by_severity: Vec<String> = Severity::ALL
        .iter()
        .rev()
        .filter_map(|sev| {
            let n = s.severity_count(*sev);
            (n > 0).then(|| format!("{n} {}", sev.as_str().to_lowercase()))
        })
        .collect();
    text.push_str("; ");
    text.push_str(&by_severity.join(", "));

    if !s.impacted_subsystems.is_empty() {
        text.push_str("; subsystems: ");
        text.push_str(&s.impacted_subsystems.join(", "));
    }
    text
}

/// One line per diff, prefixed `+`, `-` or `~`.
pub fn render_text(diffs: &[Diff]) -> String {
    let mut lines = Vec::with_capacity(diffs.len());
    for diff in diffs {
        let mut line = format!(
            "{} [{}] {}",
            diff.change_type.marker(),
            diff.severity,
            diff.summary
        );
        if let Some(subsystem) = &diff.impacted_subsystem {
            line.push_str(&format!(" ({subsystem})"));
        }
        lines.push(line);
        if let Some(details) = &diff.details {
            lines.push(format!("    {details}"));
        }
    }
    lines.join("\n")
}
