//! Downstream consumers and the impact heuristic.
//!
//! A consumer is anything that reads signals off the bus and carries a
//! free-text payload (a detection rule, a script, a mapping). A signal diff
//! impacts a consumer when the signal name occurs in the payload, ignoring
//! case. Short or reused names over-match and renamed references
//! under-match; callers should treat the result as a review list.

use serde::{Deserialize, Serialize};
use tracing::debug;

use canspec_diff::{ChangeCategory, ChangeType, ConfigError, Diff, EntityType, Severity};

/// A downstream definition that may depend on signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub payload: String,
}

impl Consumer {
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            payload: payload.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the payload mentions `signal`, ignoring case.
    pub fn references(&self, signal: &str) -> bool {
        !signal.is_empty() && self.payload.to_lowercase().contains(&signal.to_lowercase())
    }
}

/// A consumer hit by at least one signal diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactedConsumer {
    pub consumer_id: String,
    pub consumer_name: Option<String>,
    pub matched_signal_names: Vec<String>,
    pub matched_change_categories: Vec<ChangeCategory>,
    pub severity_score: f64,
}

/// Per-diff contribution to a consumer's severity score.
pub fn impact_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 5.0,
        Severity::High => 3.0,
        Severity::Medium => 2.0,
        Severity::Low => 1.0,
        Severity::Informational => 0.5,
    }
}

/// Consumers whose payload mentions a changed signal, in input order.
pub fn find_impacted_consumers(diffs: &[Diff], consumers: &[Consumer]) -> Vec<ImpactedConsumer> {
    let mut impacted = Vec::new();

    for consumer in consumers {
        let payload = consumer.payload.to_lowercase();
        let mut hit = ImpactedConsumer {
            consumer_id: consumer.id.clone(),
            consumer_name: consumer.name.clone(),
            matched_signal_names: Vec::new(),
            matched_change_categories: Vec::new(),
            severity_score: 0.0,
        };

        for diff in diffs.iter().filter(|d| d.entity_type == EntityType::Signal) {
            if diff.entity_name.is_empty() || !payload.contains(&diff.entity_name.to_lowercase()) {
                continue;
            }
            hit.severity_score += impact_weight(diff.severity);
            if !hit.matched_signal_names.contains(&diff.entity_name) {
                hit.matched_signal_names.push(diff.entity_name.clone());
            }
            if !hit.matched_change_categories.contains(&diff.category) {
                hit.matched_change_categories.push(diff.category);
            }
        }

        if !hit.matched_signal_names.is_empty() {
            impacted.push(hit);
        }
    }

    debug!(
        consumers = consumers.len(),
        impacted = impacted.len(),
        "consumer impact pass"
    );
    impacted
}

/// Raise removed-signal diffs that some consumer still references to High.
///
/// Returns the number of diffs escalated.
pub fn escalate_consumed_removals(diffs: &mut [Diff], consumers: &[Consumer]) -> usize {
    let mut escalated = 0;
    for diff in diffs.iter_mut() {
        let removed_signal =
            diff.entity_type == EntityType::Signal && diff.change_type == ChangeType::Removed;
        if removed_signal
            && diff.severity < Severity::High
            && consumers.iter().any(|c| c.references(&diff.entity_name))
        {
            diff.severity = Severity::High;
            escalated += 1;
        }
    }
    escalated
}

#[derive(Debug, Default, Deserialize)]
struct ConsumerFile {
    #[serde(default)]
    consumer: Vec<Consumer>,
}

/// Parse a consumers file: a list of `[[consumer]]` tables.
pub fn load_consumers(text: &str) -> Result<Vec<Consumer>, ConfigError> {
    let file: ConsumerFile = toml::from_str(text)?;
    Ok(file.consumer)
}
