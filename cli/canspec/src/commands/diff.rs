//! `canspec diff`: structural differences between two files.

use anyhow::Result;
use serde::Serialize;

use canspec_diff::{render_text, summarize, Diff, DiffSummary};

use crate::commands::{import_pair, SourceFile};
use crate::config::CanspecConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffReport {
    diffs: Vec<Diff>,
    summary: DiffSummary,
}

/// Diff `new` against `old` and print the diffs followed by their summary.
pub fn run(config: &CanspecConfig, old: SourceFile, new: SourceFile, json: bool) -> Result<()> {
    let pair = import_pair(config, old, new)?;
    let diffs = pair.result.diffs;
    let summary = pair
        .result
        .diff_summary
        .unwrap_or_else(|| summarize(&diffs));

    if json {
        let report = DiffReport { diffs, summary };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if !diffs.is_empty() {
            println!("{}", render_text(&diffs));
            println!();
        }
        println!("{}", summary.summary_text);
    }
    Ok(())
}
