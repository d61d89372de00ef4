//! Specification parsers for CAN bus layouts.
//!
//! One entry point dispatches on a [`SpecFormat`] tag and every format
//! converges on the canonical [`Specification`], so the diff and analysis
//! stages never branch on the source format.
//!
//! Parsing is a pure function of the input bytes: nothing is cached and no
//! shared state is touched.

pub mod dbc;
pub mod error;
pub mod format;
pub mod json;
pub mod tabular;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use canspec_core::{validate_layout, LayoutIssue, Specification};

pub use error::{ParseError, Result};
pub use format::SpecFormat;

/// What to do with a row or statement that does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Fail on the first malformed row.
    #[default]
    Abort,
    /// Record the malformed row and keep going.
    Skip,
}

/// Parser options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    #[serde(default)]
    pub row_policy: RowPolicy,
}

impl ParseOptions {
    /// Options that skip malformed rows instead of failing.
    pub fn skipping() -> Self {
        Self {
            row_policy: RowPolicy::Skip,
        }
    }
}

/// A row or statement dropped under [`RowPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row: u64,
    pub detail: String,
}

/// Everything a parse produces besides the specification itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub specification: Specification,
    pub skipped_rows: Vec<SkippedRow>,
    pub layout_issues: Vec<LayoutIssue>,
}

/// Collects skipped rows, or turns the first failure into an error.
#[derive(Debug)]
pub(crate) struct RowSink {
    policy: RowPolicy,
    skipped: Vec<SkippedRow>,
}

impl RowSink {
    pub(crate) fn new(policy: RowPolicy) -> Self {
        Self {
            policy,
            skipped: Vec::new(),
        }
    }

    /// Record a failed row. Returns the error when the policy is to abort.
    pub(crate) fn reject(&mut self, error: ParseError) -> Result<()> {
        match (self.policy, error.location()) {
            (RowPolicy::Skip, Some(row)) => {
                warn!(row, "skipping malformed row: {error}");
                self.skipped.push(SkippedRow {
                    row,
                    detail: error.to_string(),
                });
                Ok(())
            }
            _ => Err(error),
        }
    }

    pub(crate) fn into_skipped(self) -> Vec<SkippedRow> {
        self.skipped
    }
}

/// Parse a specification with the default options (abort on malformed rows).
pub fn parse(bytes: &[u8], format: SpecFormat) -> Result<Specification> {
    parse_with(bytes, format, &ParseOptions::default()).map(|outcome| outcome.specification)
}

/// Parse a specification given a textual format tag (`csv`, `json`, `dbc`).
pub fn parse_tagged(bytes: &[u8], tag: &str) -> Result<Specification> {
    parse(bytes, tag.parse()?)
}

/// Parse a specification and report skipped rows and layout issues.
pub fn parse_with(
    bytes: &[u8],
    format: SpecFormat,
    options: &ParseOptions,
) -> Result<ParseOutcome> {
    let text = decode(bytes)?;
    let mut sink = RowSink::new(options.row_policy);

    let specification = match format {
        SpecFormat::Csv => tabular::parse_csv(text, &mut sink)?,
        SpecFormat::Json => json::parse_json(text)?,
        SpecFormat::Dbc => dbc::parse_dbc(text, &mut sink)?,
    };

    let layout_issues = validate_layout(&specification);
    for issue in &layout_issues {
        warn!(format = %format, "layout issue: {issue}");
    }
    debug!(
        format = %format,
        messages = specification.message_count(),
        signals = specification.signal_count(),
        "parsed specification"
    );

    Ok(ParseOutcome {
        specification,
        skipped_rows: sink.into_skipped(),
        layout_issues,
    })
}

/// Decode UTF-8 input, dropping a leading byte-order mark.
fn decode(bytes: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "MessageId,SignalName,StartBit,BitLength,IsSigned,IsBigEndian,Min,Max,Factor,Offset,Unit\n\
                       0x100,Rpm,0,16,false,false,0,8000,1,0,rpm\n";

    #[test]
    fn tagged_dispatch() {
        let spec = parse_tagged(CSV.as_bytes(), "CSV").unwrap();
        assert_eq!(spec.message_count(), 1);
        assert!(matches!(
            parse_tagged(CSV.as_bytes(), "xlsx"),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let bytes = [0x4d, 0x65, 0xff, 0xfe];
        assert!(matches!(
            parse(&bytes, SpecFormat::Csv),
            Err(ParseError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn byte_order_mark_ignored() {
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(CSV.as_bytes());
        let spec = parse(&bytes, SpecFormat::Csv).unwrap();
        assert_eq!(spec.signal_count(), 1);
    }

    #[test]
    fn layout_issues_reported_without_failing() {
        let csv = "MessageId,SignalName,StartBit,BitLength,IsSigned,IsBigEndian,Min,Max,Factor,Offset,Unit\n\
                   0x100,Overrun,60,8,false,false,0,255,1,0,\n";
        let outcome = parse_with(csv.as_bytes(), SpecFormat::Csv, &ParseOptions::default()).unwrap();
        assert_eq!(outcome.specification.signal_count(), 1);
        assert_eq!(outcome.layout_issues.len(), 1);
        assert!(outcome.skipped_rows.is_empty());
    }

    #[test]
    fn skip_policy_collects_rows() {
        let csv = "MessageId,SignalName,StartBit,BitLength,IsSigned,IsBigEndian,Min,Max,Factor,Offset,Unit\n\
                   0x100,Good,0,8,false,false,0,255,1,0,\n\
                   0x100,Bad,zero,8,false,false,0,255,1,0,\n\
                   0x100,AlsoGood,8,8,false,false,0,255,1,0,\n";
        let outcome = parse_with(csv.as_bytes(), SpecFormat::Csv, &ParseOptions::skipping()).unwrap();
        assert_eq!(outcome.specification.signal_count(), 2);
        assert_eq!(outcome.skipped_rows.len(), 1);
        assert_eq!(outcome.skipped_rows[0].row, 3);

        let err = parse(csv.as_bytes(), SpecFormat::Csv).unwrap_err();
        assert_eq!(err.location(), Some(3));
    }
}
