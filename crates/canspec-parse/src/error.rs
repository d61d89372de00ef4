//! Parser error types.

/// Errors that can occur while parsing a specification source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The format tag is not one of `csv`, `json`, `dbc`.
    #[error("unsupported format '{0}': expected csv, json or dbc")]
    UnsupportedFormat(String),

    /// The input bytes are not UTF-8 text.
    #[error("input is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// A required CSV header column is absent.
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    /// A CSV row with the wrong field count or an unparsable field.
    #[error("malformed row {row}: {detail}")]
    MalformedRow { row: u64, detail: String },

    /// Structurally invalid JSON or a document without a `messages` array.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// A malformed DBC statement.
    #[error("invalid DBC at line {line}: {detail}")]
    InvalidDbc { line: u64, detail: String },
}

impl ParseError {
    /// Source line or row the error points at, when it has one.
    pub fn location(&self) -> Option<u64> {
        match self {
            ParseError::MalformedRow { row, .. } => Some(*row),
            ParseError::InvalidDbc { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ParseError::MalformedRow {
            row: 4,
            detail: "expected 11 fields, found 9".into(),
        };
        assert_eq!(err.to_string(), "malformed row 4: expected 11 fields, found 9");
        assert_eq!(err.location(), Some(4));
    }

    #[test]
    fn unsupported_format_has_no_location() {
        let err = ParseError::UnsupportedFormat("xml".into());
        assert!(err.to_string().contains("xml"));
        assert_eq!(err.location(), None);
    }
}
