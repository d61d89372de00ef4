//! End-to-end scenarios: two specifications in, compatibility verdict out.

use canspec_compat::{
    analyze, escalate_consumed_removals, find_impacted_consumers, AssessmentCache, CacheKey,
    CompatibilityStatus, Consumer, MigrationRisk,
};
use canspec_core::{Message, Signal, Specification};
use canspec_diff::{diff, summarize, ChangeCategory, DiffConfig, Severity, SubsystemMap};

fn config() -> DiffConfig {
    DiffConfig::new(
        SubsystemMap::new()
            .with("ADAS", "ADAS")
            .with("PCM", "Powertrain")
            .with("ABS", "Chassis"),
    )
}

#[test]
fn transmitter_rename_is_high_but_compatible() {
    let old = Specification::new(vec![
        Message::new(0x120, "VehicleStatus").with_transmitter("ADAS_CTRL")
    ]);
    let new = Specification::new(vec![
        Message::new(0x120, "VehicleStatus").with_transmitter("ADAS_CONTROLLER")
    ]);

    let diffs = diff(&old, &new, &config());
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].category, ChangeCategory::TransmitterChanged);

    let status = CompatibilityStatus::from(analyze(&diffs));
    assert_eq!(status.highest_severity, Severity::High);
    assert!(status.is_compatible);
    assert!(status.impacted_subsystems.contains(&"ADAS".to_string()));
    assert_eq!(status.migration_risk, MigrationRisk::High);
}

#[test]
fn consumed_signal_removal_becomes_breaking() {
    let old = Specification::new(vec![Message::new(0x1A0, "Wheels")
        .with_transmitter("ABS")
        .with_signal(Signal::new("WheelSpeed_FL", 0, 16).with_scaling(0.01, 0.0))
        .with_signal(Signal::new("WheelSpeed_FR", 16, 16).with_scaling(0.01, 0.0))]);
    let new = Specification::new(vec![Message::new(0x1A0, "Wheels")
        .with_transmitter("ABS")
        .with_signal(Signal::new("WheelSpeed_FL", 0, 16).with_scaling(0.01, 0.0))]);

    let consumers = [
        Consumer::new("rule-17", "if wheelspeed_fr - wheelspeed_fl > 3 then slip")
            .with_name("Wheel slip detector"),
        Consumer::new("rule-18", "if YawRate > 0.4 then alert"),
    ];

    let mut diffs = diff(&old, &new, &config());
    let before = analyze(&diffs);
    assert_eq!(before.compatibility_level, Severity::Low);
    assert_eq!(before.migration_risk, MigrationRisk::Low);

    assert_eq!(escalate_consumed_removals(&mut diffs, &consumers), 1);
    let after = analyze(&diffs);
    assert_eq!(after.compatibility_level, Severity::High);
    assert_eq!(after.breaking_change_count, 1);
    assert_eq!(after.impacted_subsystems, ["Chassis"]);

    let impacted = find_impacted_consumers(&diffs, &consumers);
    assert_eq!(impacted.len(), 1);
    assert_eq!(impacted[0].consumer_id, "rule-17");
    assert_eq!(impacted[0].severity_score, 3.0);
}

#[test]
fn summary_of_mixed_changes() {
    let old = Specification::new(vec![Message::new(0x100, "Engine")
        .with_transmitter("PCM")
        .with_signal(Signal::new("Rpm", 0, 16))
        .with_signal(Signal::new("WheelSpeed", 16, 16))]);
    let new = Specification::new(vec![
        Message::new(0x100, "Engine")
            .with_transmitter("PCM")
            .with_signal(Signal::new("Rpm", 0, 16)),
        Message::new(0x120, "VehicleStatus").with_transmitter("ADAS_CTRL"),
    ]);

    let summary = summarize(&diff(&old, &new, &config()));
    assert_eq!(summary.message_added_count, 1);
    assert_eq!(summary.signal_removed_count, 1);
    assert_eq!(summary.severity_high_count, 1);
    assert_eq!(summary.severity_low_count, 1);
    assert_eq!(summary.impacted_subsystems, ["Powertrain", "ADAS"]);
}

#[test]
fn cached_assessment_is_stable_until_refresh() {
    let old = Specification::new(vec![Message::new(0x10, "A").with_signal(Signal::new("X", 0, 8))]);
    let new = Specification::new(vec![Message::new(0x10, "A").with_signal(Signal::new("X", 0, 12))]);
    let diffs = diff(&old, &new, &config());

    let cache = AssessmentCache::new();
    let key = CacheKey::new("old-id", "new-id", "default");
    let first = cache.get_or_compute(key.clone(), false, || analyze(&diffs));
    let again = cache.get_or_compute(key.clone(), false, || analyze(&diffs));
    assert_eq!(first.generated_at, again.generated_at);
    assert_eq!(first.compatibility_score, again.compatibility_score);

    std::thread::sleep(std::time::Duration::from_millis(5));
    let refreshed = cache.get_or_compute(key, true, || analyze(&diffs));
    assert!(refreshed.generated_at > first.generated_at);
    assert_eq!(refreshed.compatibility_score, first.compatibility_score);
}

#[test]
fn new_message_scores_as_one_change() {
    let new = Specification::new(vec![Message::new(0x300, "DoorStatus")
        .with_transmitter("BCM")
        .with_signal(Signal::new("DriverDoor", 0, 1))
        .with_signal(Signal::new("PassengerDoor", 1, 1))
        .with_signal(Signal::new("TrunkOpen", 2, 1))]);

    let diffs = diff(&Specification::empty(), &new, &config());
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].category, ChangeCategory::MessageAdded);

    let assessment = analyze(&diffs);
    assert_eq!(assessment.compatibility_score, 85);
    assert_eq!(assessment.key_findings.len(), 1);
    assert!(assessment.key_findings[0].starts_with("[High] MessageAdded"));

    let summary = summarize(&diffs);
    assert_eq!(summary.message_added_count, 1);
    assert_eq!(summary.signal_added_count, 0);
}
