//! `canspec check`: compatibility verdict for a new version.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{ensure, Result};
use serde::Serialize;

use canspec_compat::{analyze, CompatibilityStatus, ImpactedConsumer};

use crate::commands::{import_pair, SourceFile};
use crate::config::{load_consumers_file, CanspecConfig};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    status: CompatibilityStatus,
    escalated_removals: usize,
    impacted_consumers: Vec<ImpactedConsumer>,
}

/// Assess `new` against `old`.
///
/// Without a consumers file the verdict goes through the assessment cache
/// under `context`. With one, removals of consumed signals are escalated
/// before scoring, the impacted consumers are listed and no context applies.
pub fn run(
    config: &CanspecConfig,
    old: SourceFile,
    new: SourceFile,
    consumers: Option<&Path>,
    context: Option<&str>,
    json: bool,
) -> Result<()> {
    ensure!(
        consumers.is_none() || context.is_none(),
        "--context cannot be combined with --consumers"
    );
    let context = context.unwrap_or(config.analysis.context.as_str());
    let consumers = consumers.map(load_consumers_file).transpose()?;
    let pair = import_pair(config, old, new)?;

    let report = match consumers {
        Some(consumers) => {
            let impact = pair.service.consumer_impact(pair.old, pair.new, &consumers)?;
            CheckReport {
                status: CompatibilityStatus::from(analyze(&impact.diffs)),
                escalated_removals: impact.escalated_removals,
                impacted_consumers: impact.impacted_consumers,
            }
        }
        None => CheckReport {
            status: pair.service.compatibility(pair.old, pair.new, context, false)?,
            escalated_removals: 0,
            impacted_consumers: Vec::new(),
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

fn render(report: &CheckReport) -> String {
    let status = &report.status;
    let mut out = String::new();
    let _ = writeln!(out, "{}", status.summary);
    let _ = writeln!(
        out,
        "  {} breaking, {} warning(s), {} informational",
        status.breaking_change_count, status.warning_count, status.info_count
    );
    if !status.impacted_subsystems.is_empty() {
        let _ = writeln!(out, "  subsystems: {}", status.impacted_subsystems.join(", "));
    }
    for finding in &status.key_findings {
        let _ = writeln!(out, "  - {finding}");
    }

    if report.escalated_removals > 0 {
        let _ = writeln!(
            out,
            "{} consumed signal removal(s) escalated",
            report.escalated_removals
        );
    }
    for consumer in &report.impacted_consumers {
        let label = consumer
            .consumer_name
            .as_deref()
            .unwrap_or(&consumer.consumer_id);
        let _ = writeln!(
            out,
            "consumer {label}: {} (score {})",
            consumer.matched_signal_names.join(", "),
            consumer.severity_score
        );
    }
    out
}
