//! CSV specification sources.
//!
//! One row per signal. Rows that share a `MessageId` are grouped into one
//! message in first-appearance order. Column order comes from the header,
//! whose names are matched case-insensitively.

use csv::{ReaderBuilder, StringRecord, Trim};

use canspec_core::{normalize_unit, MessageId, Signal, Specification, SpecificationBuilder};

use crate::error::{ParseError, Result};
use crate::RowSink;

/// Columns every CSV source must carry.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "MessageId",
    "SignalName",
    "StartBit",
    "BitLength",
    "IsSigned",
    "IsBigEndian",
    "Min",
    "Max",
    "Factor",
    "Offset",
    "Unit",
];

/// Column positions resolved from the header row.
#[derive(Debug)]
struct Columns {
    required: [usize; 11],
    message_name: Option<usize>,
    byte_length: Option<usize>,
    transmitter: Option<usize>,
    cycle_time: Option<usize>,
    width: usize,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let mut required = [0usize; 11];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name).ok_or_else(|| ParseError::MissingColumn {
                column: name.to_string(),
            })?;
        }

        Ok(Self {
            required,
            message_name: find("MessageName"),
            byte_length: find("ByteLength"),
            transmitter: find("Transmitter"),
            cycle_time: find("CycleTime"),
            width: header.len(),
        })
    }

    fn field<'r>(&self, record: &'r StringRecord, column: usize) -> &'r str {
        record.get(self.required[column]).unwrap_or_default()
    }

    fn optional<'r>(&self, record: &'r StringRecord, column: Option<usize>) -> Option<&'r str> {
        column
            .and_then(|c| record.get(c))
            .filter(|value| !value.is_empty())
    }
}

/// Message-level attributes a row may declare.
#[derive(Debug, Default)]
struct RowMessage<'r> {
    name: Option<&'r str>,
    byte_length: Option<u16>,
    transmitter: Option<&'r str>,
    cycle_time: Option<u32>,
}

pub(crate) fn parse_csv(text: &str, sink: &mut RowSink) -> Result<Specification> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let header = reader.headers().map_err(|e| csv_error(&e, 1))?.clone();
    let columns = Columns::from_header(&header)?;
    let mut builder = SpecificationBuilder::new();

    for (index, result) in reader.records().enumerate() {
        // Header is line 1; fall back to a dense count when the reader has no position.
        let fallback_row = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                sink.reject(csv_error(&e, fallback_row))?;
                continue;
            }
        };
        let row = record.position().map(|p| p.line()).unwrap_or(fallback_row);

        match parse_row(&columns, &record) {
            Ok((id, signal, attrs)) => {
                let fresh = !builder.contains(id);
                let message = builder.message_mut(id);
                if fresh {
                    apply_message_attrs(message, &attrs);
                }
                message.signals.push(signal);
            }
            Err(detail) => sink.reject(ParseError::MalformedRow { row, detail })?,
        }
    }

    Ok(builder.build())
}

fn apply_message_attrs(message: &mut canspec_core::Message, attrs: &RowMessage<'_>) {
    if let Some(name) = attrs.name {
        message.name = name.to_string();
    }
    if let Some(byte_length) = attrs.byte_length {
        message.byte_length = byte_length;
    }
    if let Some(transmitter) = attrs.transmitter {
        message.transmitter = Some(transmitter.to_string());
    }
    message.cycle_time_ms = attrs.cycle_time;
}

fn parse_row<'r>(
    columns: &Columns,
    record: &'r StringRecord,
) -> std::result::Result<(MessageId, Signal, RowMessage<'r>), String> {
    if record.len() != columns.width {
        return Err(format!(
            "expected {} fields, found {}",
            columns.width,
            record.len()
        ));
    }

    let field = |column: usize| columns.field(record, column);

    let id: MessageId = field(0)
        .parse()
        .map_err(|e: canspec_core::ModelError| e.to_string())?;
    let name = field(1);
    if name.is_empty() {
        return Err("SignalName is empty".into());
    }

    let signal = Signal {
        name: name.to_string(),
        start_bit: number(field(2), "StartBit")?,
        bit_length: number(field(3), "BitLength")?,
        is_signed: boolean(field(4), "IsSigned")?,
        is_big_endian: boolean(field(5), "IsBigEndian")?,
        min: number(field(6), "Min")?,
        max: number(field(7), "Max")?,
        factor: number(field(8), "Factor")?,
        offset: number(field(9), "Offset")?,
        unit: normalize_unit(field(10).to_string()),
    };

    let attrs = RowMessage {
        name: columns.optional(record, columns.message_name),
        byte_length: columns
            .optional(record, columns.byte_length)
            .map(|v| number(v, "ByteLength"))
            .transpose()?,
        transmitter: columns.optional(record, columns.transmitter),
        cycle_time: columns
            .optional(record, columns.cycle_time)
            .map(|v| number(v, "CycleTime"))
            .transpose()?,
    };

    Ok((id, signal, attrs))
}

fn number<T: std::str::FromStr>(value: &str, column: &str) -> std::result::Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{column} '{value}' is not a valid number"))
}

/// Accepts `true/false`, `1/0` and `yes/no`, ignoring case.
fn boolean(value: &str, column: &str) -> std::result::Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(format!("{column} '{value}' is not a boolean")),
    }
}

fn csv_error(error: &csv::Error, fallback_row: u64) -> ParseError {
    ParseError::MalformedRow {
        row: error.position().map(|p| p.line()).unwrap_or(fallback_row),
        detail: error.to_string(),
    }
}
