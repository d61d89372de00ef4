//! Caller-facing compatibility status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use canspec_diff::Severity;

use crate::analyzer::{CompatibilityAssessment, MigrationRisk};

/// Compatibility verdict for a pair of specifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityStatus {
    /// True when no diff is Critical.
    pub is_compatible: bool,
    pub highest_severity: Severity,
    pub breaking_change_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub compatibility_score: u32,
    pub migration_risk: MigrationRisk,
    pub summary: String,
    pub impacted_subsystems: Vec<String>,
    pub key_findings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl From<&CompatibilityAssessment> for CompatibilityStatus {
    fn from(a: &CompatibilityAssessment) -> Self {
        let is_compatible = a.compatibility_level < Severity::Critical;
        let summary = format!(
            "{}: score {}/100, {} breaking, {} warning, {} info; migration risk {}",
            if is_compatible { "Compatible" } else { "Incompatible" },
            a.compatibility_score,
            a.breaking_change_count,
            a.warning_count,
            a.info_count,
            a.migration_risk,
        );
        Self {
            is_compatible,
            highest_severity: a.compatibility_level,
            breaking_change_count: a.breaking_change_count,
            warning_count: a.warning_count,
            info_count: a.info_count,
            compatibility_score: a.compatibility_score,
            migration_risk: a.migration_risk,
            summary,
            impacted_subsystems: a.impacted_subsystems.clone(),
            key_findings: a.key_findings.clone(),
            generated_at: a.generated_at,
        }
    }
}

impl From<CompatibilityAssessment> for CompatibilityStatus {
    fn from(a: CompatibilityAssessment) -> Self {
        Self::from(&a)
    }
}
