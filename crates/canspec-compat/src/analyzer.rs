//! Compatibility scoring of a diff list.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use canspec_diff::{ChangeCategory, Diff, Severity};

/// Starting score before any deductions.
pub const MAX_SCORE: u32 = 100;

/// Below this score migration risk is high regardless of change mix.
pub const HIGH_RISK_SCORE: u32 = 50;

/// How risky it is to move consumers from the old specification to the new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MigrationRisk {
    Low,
    Medium,
    High,
}

impl fmt::Display for MigrationRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationRisk::Low => write!(f, "Low"),
            MigrationRisk::Medium => write!(f, "Medium"),
            MigrationRisk::High => write!(f, "High"),
        }
    }
}

/// Result of analyzing a diff list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityAssessment {
    /// Highest severity present; `Informational` for an empty diff list.
    pub compatibility_level: Severity,
    /// 0 to 100, higher is more compatible.
    pub compatibility_score: u32,
    pub migration_risk: MigrationRisk,
    pub breaking_change_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub key_findings: Vec<String>,
    pub impacted_subsystems: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Score deduction per diff.
pub fn score_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 25,
        Severity::High => 15,
        Severity::Medium => 5,
        Severity::Low => 2,
        Severity::Informational => 0,
    }
}

/// Analyze `diffs`, stamping the assessment with the current time.
pub fn analyze(diffs: &[Diff]) -> CompatibilityAssessment {
    analyze_at(diffs, Utc::now())
}

/// Analyze `diffs` with an explicit timestamp.
pub fn analyze_at(diffs: &[Diff], generated_at: DateTime<Utc>) -> CompatibilityAssessment {
    let mut breaking = 0;
    let mut warnings = 0;
    let mut info = 0;
    let mut deduction: u32 = 0;

    for diff in diffs {
        match diff.severity {
            Severity::Critical | Severity::High => breaking += 1,
            Severity::Medium => warnings += 1,
            Severity::Low | Severity::Informational => info += 1,
        }
        deduction = deduction.saturating_add(score_weight(diff.severity));
    }

    let score = MAX_SCORE.saturating_sub(deduction);
    let level = diffs
        .iter()
        .map(|d| d.severity)
        .max()
        .unwrap_or(Severity::Informational);
    let risk = if breaking > 0 || score < HIGH_RISK_SCORE {
        MigrationRisk::High
    } else if warnings > 0 {
        MigrationRisk::Medium
    } else {
        MigrationRisk::Low
    };

    debug!(
        diffs = diffs.len(),
        score,
        level = %level,
        risk = %risk,
        "analyzed compatibility"
    );

    CompatibilityAssessment {
        compatibility_level: level,
        compatibility_score: score,
        migration_risk: risk,
        breaking_change_count: breaking,
        warning_count: warnings,
        info_count: info,
        key_findings: key_findings(diffs),
        impacted_subsystems: impacted_subsystems(diffs),
        generated_at,
    }
}

/// One line per distinct category, most severe first, then by first occurrence.
pub fn key_findings(diffs: &[Diff]) -> Vec<String> {
    struct Finding {
        category: ChangeCategory,
        severity: Severity,
        first: usize,
        count: usize,
    }

    let mut findings: Vec<Finding> = Vec::new();
    for (index, diff) in diffs.iter().enumerate() {
        match findings.iter_mut().find(|f| f.category == diff.category) {
            Some(f) => {
                f.severity = f.severity.max(diff.severity);
                f.count += 1;
            }
            None => findings.push(Finding {
                category: diff.category,
                severity: diff.severity,
                first: index,
                count: 1,
            }),
        }
    }

    findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.first.cmp(&b.first)));
    findings
        .into_iter()
        .map(|f| {
            format!(
                "[{}] {}: {} ({} change{})",
                f.severity,
                f.category,
                f.category.describe(),
                f.count,
                if f.count == 1 { "" } else { "s" }
            )
        })
        .collect()
}

/// Distinct non-empty subsystems in first-seen order.
pub fn impacted_subsystems(diffs: &[Diff]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for subsystem in diffs.iter().filter_map(|d| d.impacted_subsystem.as_deref()) {
        if !subsystem.is_empty() && !out.iter().any(|s| s == subsystem) {
            out.push(subsystem.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn d(category: ChangeCategory) -> Diff {
        Diff::new(category, "X", 0x10)
    }

    #[test]
    fn empty_diff_list_is_fully_compatible() {
        let a = analyze_at(&[], at());
        assert_eq!(a.compatibility_level, Severity::Informational);
        assert_eq!(a.compatibility_score, 100);
        assert_eq!(a.migration_risk, MigrationRisk::Low);
        assert!(a.key_findings.is_empty());
        assert_eq!(a.generated_at, at());
    }

    #[test]
    fn counts_and_score() {
        let diffs = [
            d(ChangeCategory::BitLayoutChanged),
            d(ChangeCategory::TransmitterChanged),
            d(ChangeCategory::ScalingChanged),
            d(ChangeCategory::SignalRemoved),
            d(ChangeCategory::UnitChanged),
        ];
        let a = analyze_at(&diffs, at());
        assert_eq!(a.breaking_change_count, 2);
        assert_eq!(a.warning_count, 1);
        assert_eq!(a.info_count, 2);
        assert_eq!(a.compatibility_score, 100 - 25 - 15 - 5 - 2);
        assert_eq!(a.compatibility_level, Severity::Critical);
        assert_eq!(a.migration_risk, MigrationRisk::High);
    }

    #[test]
    fn score_saturates_at_zero() {
        let diffs = vec![d(ChangeCategory::MessageRemoved); 10];
        assert_eq!(analyze_at(&diffs, at()).compatibility_score, 0);
    }

    #[test]
    fn low_score_alone_is_high_risk() {
        // 11 medium diffs: no breaking change, score 45.
        let diffs = vec![d(ChangeCategory::SignalAdded); 11];
        let a = analyze_at(&diffs, at());
        assert_eq!(a.breaking_change_count, 0);
        assert_eq!(a.compatibility_score, 45);
        assert_eq!(a.migration_risk, MigrationRisk::High);
    }

    #[test]
    fn warnings_only_is_medium_risk() {
        let a = analyze_at(&[d(ChangeCategory::ScalingChanged)], at());
        assert_eq!(a.migration_risk, MigrationRisk::Medium);
        let a = analyze_at(&[d(ChangeCategory::UnitChanged)], at());
        assert_eq!(a.migration_risk, MigrationRisk::Low);
    }

    #[test]
    fn findings_ordered_by_severity_then_first_occurrence() {
        let diffs = [
            d(ChangeCategory::UnitChanged),
            d(ChangeCategory::SignalAdded),
            d(ChangeCategory::CycleTimeChanged),
            d(ChangeCategory::ScalingChanged),
            d(ChangeCategory::SignalAdded),
            d(ChangeCategory::MessageRemoved),
        ];
        let findings = key_findings(&diffs);
        assert_eq!(findings.len(), 5);
        assert!(findings[0].starts_with("[Critical] MessageRemoved"));
        assert!(findings[1].starts_with("[High] CycleTimeChanged"));
        assert!(findings[2].starts_with("[Medium] SignalAdded"));
        assert!(findings[2].ends_with("(2 changes)"));
        assert!(findings[3].starts_with("[Medium] ScalingChanged"));
        assert!(findings[4].starts_with("[Informational] UnitChanged"));
    }

    #[test]
    fn category_takes_its_highest_severity() {
        let diffs = [
            d(ChangeCategory::SignalRemoved),
            d(ChangeCategory::ScalingChanged),
            d(ChangeCategory::SignalRemoved).with_severity(Severity::High),
        ];
        let findings = key_findings(&diffs);
        assert!(findings[0].starts_with("[High] SignalRemoved"));
    }

    #[test]
    fn subsystems_distinct_and_ordered() {
        let diffs = [
            d(ChangeCategory::SignalAdded).with_subsystem(Some("Powertrain".into())),
            d(ChangeCategory::SignalAdded),
            d(ChangeCategory::SignalAdded).with_subsystem(Some("ADAS".into())),
            d(ChangeCategory::SignalAdded).with_subsystem(Some("".into())),
            d(ChangeCategory::SignalAdded).with_subsystem(Some("Powertrain".into())),
        ];
        assert_eq!(impacted_subsystems(&diffs), ["Powertrain", "ADAS"]);
    }
}
