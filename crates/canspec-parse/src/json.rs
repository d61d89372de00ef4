//! JSON specification sources.
//!
//! The wire shape is `{ "messages": [ { "messageId": .., "signals": [..] } ] }`.
//! Absent optional fields take zero values (empty string, `0`, `false`), and
//! an absent byte length takes the classic 8-byte payload.

use serde::Deserialize;

use canspec_core::{
    normalize_unit, Message, MessageId, Signal, Specification, SpecificationBuilder,
    DEFAULT_BYTE_LENGTH,
};

use crate::error::{ParseError, Result};

#[derive(Debug, Deserialize)]
struct JsonDocument {
    messages: Vec<JsonMessage>,
}

/// `messageId` may be a JSON integer or a hex/decimal string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonMessageId {
    Number(u64),
    Text(String),
}

impl JsonMessageId {
    fn resolve(&self) -> Result<MessageId> {
        match self {
            JsonMessageId::Number(n) => u32::try_from(*n)
                .map(MessageId)
                .map_err(|_| ParseError::InvalidJson(format!("messageId {n} is out of range"))),
            JsonMessageId::Text(s) => s
                .parse()
                .map_err(|e: canspec_core::ModelError| ParseError::InvalidJson(e.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonMessage {
    message_id: JsonMessageId,
    #[serde(default)]
    name: String,
    #[serde(default, alias = "dlc")]
    byte_length: Option<u16>,
    #[serde(default)]
    transmitter: Option<String>,
    #[serde(default)]
    cycle_time: Option<u32>,
    #[serde(default)]
    signals: Vec<JsonSignal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsonSignal {
    name: String,
    start_bit: u16,
    bit_length: u16,
    is_signed: bool,
    is_big_endian: bool,
    min: f64,
    max: f64,
    factor: f64,
    offset: f64,
    unit: Option<String>,
}

impl From<JsonSignal> for Signal {
    fn from(s: JsonSignal) -> Self {
        Signal {
            name: s.name,
            start_bit: s.start_bit,
            bit_length: s.bit_length,
            is_big_endian: s.is_big_endian,
            is_signed: s.is_signed,
            factor: s.factor,
            offset: s.offset,
            min: s.min,
            max: s.max,
            unit: s.unit.and_then(normalize_unit),
        }
    }
}

pub(crate) fn parse_json(text: &str) -> Result<Specification> {
    let document: JsonDocument =
        serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let mut builder = SpecificationBuilder::new();
    for entry in document.messages {
        let id = entry.message_id.resolve()?;
        let transmitter = entry.transmitter.filter(|t| !t.trim().is_empty());
        builder.merge(Message {
            id,
            name: entry.name,
            byte_length: entry.byte_length.unwrap_or(DEFAULT_BYTE_LENGTH),
            transmitter,
            cycle_time_ms: entry.cycle_time,
            signals: entry.signals.into_iter().map(Signal::from).collect(),
        });
    }
    Ok(builder.build())
}
