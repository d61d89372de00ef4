//! `canspec parse`: parse one file and show its canonical form.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use canspec_parse::{parse_with, ParseOptions, ParseOutcome};

use crate::commands::SourceFile;

/// Parse `source` and print a report, or the canonical JSON with `json`.
pub fn run(source: &SourceFile, skip_malformed: bool, json: bool) -> Result<()> {
    let options = if skip_malformed {
        ParseOptions::skipping()
    } else {
        ParseOptions::default()
    };
    let outcome = parse_with(&source.bytes, source.format, &options)
        .with_context(|| format!("parsing {}", source.name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.specification)?);
    } else {
        print!("{}", render(source, &outcome));
    }
    Ok(())
}

/// Human-readable parse report.
pub fn render(source: &SourceFile, outcome: &ParseOutcome) -> String {
    let spec = &outcome.specification;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}): {} message(s), {} signal(s)",
        source.name,
        source.format,
        spec.message_count(),
        spec.signal_count()
    );

    for message in spec.messages() {
        let _ = write!(
            out,
            "  {} {} [{} bytes",
            message.id,
            message.label(),
            message.byte_length
        );
        if let Some(tx) = &message.transmitter {
            let _ = write!(out, ", tx {tx}");
        }
        if let Some(cycle) = message.cycle_time_ms {
            let _ = write!(out, ", {cycle} ms");
        }
        out.push_str("]\n");

        for signal in &message.signals {
            let _ = writeln!(
                out,
                "    {} {} ({},{}) [{}|{}] {}",
                signal.name,
                signal.layout_label(),
                signal.factor,
                signal.offset,
                signal.min,
                signal.max,
                signal.unit.as_deref().unwrap_or("")
            );
        }
    }

    for row in &outcome.skipped_rows {
        let _ = writeln!(out, "warning: skipped row {}: {}", row.row, row.detail);
    }
    for issue in &outcome.layout_issues {
        let _ = writeln!(out, "warning: {issue}");
    }
    out
}
