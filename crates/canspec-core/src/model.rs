//! The canonical CAN specification model.
//!
//! Every input format converges on these types: a [`Specification`] is an
//! ordered list of [`Message`]s, each carrying an ordered list of
//! [`Signal`]s. Downstream diffing and analysis never see the source format.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Classic CAN frame payload size, used when a source declares no DLC.
pub const DEFAULT_BYTE_LENGTH: u16 = 8;

/// Numeric CAN identifier of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u32);

impl MessageId {
    /// The raw identifier value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<u32> for MessageId {
    fn from(value: u32) -> Self {
        MessageId(value)
    }
}

impl FromStr for MessageId {
    type Err = ModelError;

    /// Parse `0x`-prefixed hex (any digit case) or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => text.parse::<u32>(),
        };
        parsed
            .map(MessageId)
            .map_err(|_| ModelError::InvalidMessageId(s.to_string()))
    }
}

/// A named bit-field inside a message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub name: String,
    pub start_bit: u16,
    pub bit_length: u16,
    pub is_big_endian: bool,
    pub is_signed: bool,
    pub factor: f64,
    pub offset: f64,
    pub min: f64,
    pub max: f64,
    pub unit: Option<String>,
}

impl Signal {
    /// Create an unsigned little-endian signal with identity scaling.
    pub fn new(name: impl Into<String>, start_bit: u16, bit_length: u16) -> Self {
        Self {
            name: name.into(),
            start_bit,
            bit_length,
            is_big_endian: false,
            is_signed: false,
            factor: 1.0,
            offset: 0.0,
            min: 0.0,
            max: 0.0,
            unit: None,
        }
    }

    /// Builder: Motorola byte order.
    pub fn big_endian(mut self) -> Self {
        self.is_big_endian = true;
        self
    }

    /// Builder: two's complement raw value.
    pub fn signed(mut self) -> Self {
        self.is_signed = true;
        self
    }

    /// Builder: physical = raw * factor + offset.
    pub fn with_scaling(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    /// Builder: physical value range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Builder: engineering unit. Blank units are stored as `None`.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = normalize_unit(unit.into());
        self
    }

    /// Exclusive upper bit of the signal under the linear layout rule.
    pub fn end_bit(&self) -> u32 {
        u32::from(self.start_bit) + u32::from(self.bit_length)
    }

    /// Compact DBC-style layout label, e.g. `8|16@1-`.
    pub fn layout_label(&self) -> String {
        format!(
            "{}|{}@{}{}",
            self.start_bit,
            self.bit_length,
            if self.is_big_endian { 0 } else { 1 },
            if self.is_signed { '-' } else { '+' }
        )
    }

    /// Human label for the byte order.
    pub fn byte_order(&self) -> &'static str {
        if self.is_big_endian {
            "BigEndian"
        } else {
            "LittleEndian"
        }
    }
}

/// Map an empty or whitespace-only unit to `None`.
pub fn normalize_unit(unit: String) -> Option<String> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == unit.len() {
        Some(unit)
    } else {
        Some(trimmed.to_string())
    }
}

/// A CAN frame definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub name: String,
    pub byte_length: u16,
    pub transmitter: Option<String>,
    pub cycle_time_ms: Option<u32>,
    pub signals: Vec<Signal>,
}

impl Message {
    /// Create an empty message with the classic 8-byte payload.
    pub fn new(id: impl Into<MessageId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            byte_length: DEFAULT_BYTE_LENGTH,
            transmitter: None,
            cycle_time_ms: None,
            signals: Vec::new(),
        }
    }

    /// Builder: payload length in bytes (DLC).
    pub fn with_byte_length(mut self, byte_length: u16) -> Self {
        self.byte_length = byte_length;
        self
    }

    /// Builder: transmitting node.
    pub fn with_transmitter(mut self, transmitter: impl Into<String>) -> Self {
        self.transmitter = Some(transmitter.into());
        self
    }

    /// Builder: cycle time in milliseconds.
    pub fn with_cycle_time(mut self, ms: u32) -> Self {
        self.cycle_time_ms = Some(ms);
        self
    }

    /// Builder: append a signal.
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Payload size in bits.
    pub fn bit_capacity(&self) -> u32 {
        u32::from(self.byte_length) * 8
    }

    /// First signal with the given name.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// The message name, or its id label when the source carried no name.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// An ordered, id-deduplicated collection of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    messages: Vec<Message>,
}

impl Specification {
    /// Build a specification, merging messages that share an id.
    ///
    /// The first occurrence of an id fixes the message's position and
    /// attributes; later occurrences only contribute their signals.
    pub fn new(messages: Vec<Message>) -> Self {
        let mut builder = SpecificationBuilder::new();
        for message in messages {
            builder.merge(message);
        }
        builder.build()
    }

    /// A specification with no messages.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Messages in first-appearance order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Look up a message by id.
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Number of messages.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Total number of signals across all messages.
    pub fn signal_count(&self) -> usize {
        self.messages.iter().map(|m| m.signals.len()).sum()
    }

    /// True when the specification has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Incremental builder used by the format parsers.
///
/// Keeps an id index so that grouping rows by message id stays linear.
#[derive(Debug, Default)]
pub struct SpecificationBuilder {
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
}

impl SpecificationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The message with this id, created with default attributes on first use.
    pub fn message_mut(&mut self, id: MessageId) -> &mut Message {
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                self.messages.push(Message::new(id, String::new()));
                let slot = self.messages.len() - 1;
                self.index.insert(id, slot);
                slot
            }
        };
        &mut self.messages[slot]
    }

    /// Whether a message with this id has been seen.
    pub fn contains(&self, id: MessageId) -> bool {
        self.index.contains_key(&id)
    }

    /// Add a whole message, or append its signals to an existing one.
    pub fn merge(&mut self, message: Message) {
        match self.index.get(&message.id) {
            Some(&slot) => self.messages[slot].signals.extend(message.signals),
            None => {
                self.index.insert(message.id, self.messages.len());
                self.messages.push(message);
            }
        }
    }

    /// Append a signal to the message with this id.
    pub fn push_signal(&mut self, id: MessageId, signal: Signal) {
        self.message_mut(id).signals.push(signal);
    }

    pub fn build(self) -> Specification {
        Specification {
            messages: self.messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_decimal_ids_agree() {
        let hex: MessageId = "0x100".parse().unwrap();
        let upper: MessageId = "0X1aB".parse().unwrap();
        let dec: MessageId = "256".parse().unwrap();
        assert_eq!(hex, dec);
        assert_eq!(hex.value(), 256);
        assert_eq!(upper.value(), 0x1AB);
    }

    #[test]
    fn invalid_ids_rejected() {
        assert!("0xZZ".parse::<MessageId>().is_err());
        assert!("".parse::<MessageId>().is_err());
        assert!("-5".parse::<MessageId>().is_err());
        assert!("0x1FFFFFFFF".parse::<MessageId>().is_err());
    }

    #[test]
    fn id_display_is_hex() {
        assert_eq!(MessageId(0x120).to_string(), "0x120");
    }

    #[test]
    fn blank_unit_normalized() {
        let s = Signal::new("Speed", 0, 16).with_unit("   ");
        assert_eq!(s.unit, None);
        let s = Signal::new("Speed", 0, 16).with_unit(" km/h ");
        assert_eq!(s.unit.as_deref(), Some("km/h"));
    }

    #[test]
    fn layout_label_format() {
        let s = Signal::new("Torque", 8, 12).big_endian().signed();
        assert_eq!(s.layout_label(), "8|12@0-");
        assert_eq!(Signal::new("A", 0, 1).layout_label(), "0|1@1+");
    }

    #[test]
    fn messages_sharing_id_are_merged() {
        let spec = Specification::new(vec![
            Message::new(0x100, "Engine").with_signal(Signal::new("Rpm", 0, 16)),
            Message::new(0x200, "Brake").with_signal(Signal::new("Pressure", 0, 8)),
            Message::new(0x100, "Ignored").with_signal(Signal::new("Temp", 16, 8)),
        ]);
        assert_eq!(spec.message_count(), 2);
        assert_eq!(spec.signal_count(), 3);
        let engine = spec.message(MessageId(0x100)).unwrap();
        assert_eq!(engine.name, "Engine");
        let names: Vec<_> = engine.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Rpm", "Temp"]);
        assert_eq!(spec.messages()[1].id, MessageId(0x200));
    }

    #[test]
    fn builder_creates_on_first_use() {
        let mut b = SpecificationBuilder::new();
        b.push_signal(MessageId(7), Signal::new("A", 0, 1));
        b.push_signal(MessageId(3), Signal::new("B", 0, 1));
        b.push_signal(MessageId(7), Signal::new("C", 1, 1));
        assert!(b.contains(MessageId(3)));
        let spec = b.build();
        let ids: Vec<_> = spec.messages().iter().map(|m| m.id.value()).collect();
        assert_eq!(ids, [7, 3]);
        assert_eq!(spec.messages()[0].byte_length, DEFAULT_BYTE_LENGTH);
    }

    #[test]
    fn label_falls_back_to_id() {
        assert_eq!(Message::new(0x7E0, "").label(), "0x7E0");
        assert_eq!(Message::new(0x7E0, "Diag").label(), "Diag");
    }
}
