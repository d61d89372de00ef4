//! Source format tags.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// The supported specification source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    Csv,
    Json,
    Dbc,
}

impl SpecFormat {
    /// All formats, in tag order.
    pub const ALL: [SpecFormat; 3] = [SpecFormat::Csv, SpecFormat::Json, SpecFormat::Dbc];

    /// Lowercase tag for this format.
    pub fn tag(self) -> &'static str {
        match self {
            SpecFormat::Csv => "csv",
            SpecFormat::Json => "json",
            SpecFormat::Dbc => "dbc",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SpecFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        SpecFormat::ALL
            .into_iter()
            .find(|format| format.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ParseError::UnsupportedFormat(s.to_string()))
    }
}
