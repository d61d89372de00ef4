//! DBC specification sources.
//!
//! Only the statements that describe payload layout are read:
//!
//! ```text
//! BO_ <id> <name>: <dlc> <transmitter>
//!  SG_ <name> [mux] : <start>|<len>@<0|1><+|-> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>
//! BA_ "GenMsgCycleTime" BO_ <id> <ms>;
//! ```
//!
//! Everything else (nodes, value tables, comments, other attributes) is
//! skipped.

use tracing::debug;

use canspec_core::{normalize_unit, MessageId, Signal, Specification, SpecificationBuilder};

use crate::error::{ParseError, Result};
use crate::RowSink;

/// Placeholder node name for "no transmitter".
const NO_NODE: &str = "Vector__XXX";

/// Pseudo-message holding signals that belong to no frame.
const INDEPENDENT_SIGNALS: &str = "VECTOR__INDEPENDENT_SIG_MSG";

/// Bit 31 of a DBC id flags an extended (29-bit) frame.
const EXTENDED_FRAME_FLAG: u32 = 0x8000_0000;

/// Where `SG_` lines currently attach.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    None,
    Message(MessageId),
    Ignored,
}

pub(crate) fn parse_dbc(text: &str, sink: &mut RowSink) -> Result<Specification> {
    let mut builder = SpecificationBuilder::new();
    let mut cursor = Cursor::None;
    let mut cycle_times = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index as u64 + 1;
        let trimmed = raw.trim();
        let (keyword, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));

        match keyword {
            "BO_" => match parse_message(rest) {
                Ok(header) if header.name == INDEPENDENT_SIGNALS => cursor = Cursor::Ignored,
                Ok(header) => {
                    let fresh = !builder.contains(header.id);
                    let message = builder.message_mut(header.id);
                    if fresh {
                        message.name = header.name.to_string();
                        message.byte_length = header.byte_length;
                        message.transmitter = header.transmitter.map(str::to_string);
                    }
                    cursor = Cursor::Message(header.id);
                }
                Err(detail) => {
                    cursor = Cursor::Ignored;
                    sink.reject(ParseError::InvalidDbc { line, detail })?;
                }
            },
            "SG_" => match cursor {
                Cursor::Message(id) => match parse_signal(rest) {
                    Ok(signal) => builder.push_signal(id, signal),
                    Err(detail) => sink.reject(ParseError::InvalidDbc { line, detail })?,
                },
                Cursor::Ignored => {}
                Cursor::None => sink.reject(ParseError::InvalidDbc {
                    line,
                    detail: "SG_ before any BO_".into(),
                })?,
            },
            "BA_" => {
                if let Some(entry) = parse_cycle_time(rest) {
                    cycle_times.push(entry);
                }
            }
            _ => {}
        }
    }

    for (id, ms) in cycle_times {
        if builder.contains(id) {
            builder.message_mut(id).cycle_time_ms = Some(ms);
        } else {
            debug!(id = %id, "cycle time for unknown message ignored");
        }
    }

    Ok(builder.build())
}

#[derive(Debug)]
struct MessageHeader<'a> {
    id: MessageId,
    name: &'a str,
    byte_length: u16,
    transmitter: Option<&'a str>,
}

fn parse_message(rest: &str) -> std::result::Result<MessageHeader<'_>, String> {
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| "BO_ is missing ':' after the message name".to_string())?;
    let mut head = head.split_whitespace();
    let id = parse_id(head.next().ok_or("BO_ is missing the message id")?)?;
    let name = head.next().ok_or("BO_ is missing the message name")?;

    let mut tail = tail.split_whitespace();
    let dlc = tail.next().ok_or("BO_ is missing the DLC")?;
    let byte_length = dlc
        .parse()
        .map_err(|_| format!("DLC '{dlc}' is not a number"))?;
    let transmitter = tail.next().filter(|node| *node != NO_NODE);

    Ok(MessageHeader {
        id,
        name,
        byte_length,
        transmitter,
    })
}

fn parse_id(text: &str) -> std::result::Result<MessageId, String> {
    text.parse::<u32>()
        .map(|raw| MessageId(raw & !EXTENDED_FRAME_FLAG))
        .map_err(|_| format!("message id '{text}' is not a number"))
}

fn parse_signal(rest: &str) -> std::result::Result<Signal, String> {
    let (head, body) = rest
        .split_once(':')
        .ok_or_else(|| "SG_ is missing ':' after the signal name".to_string())?;
    // The optional multiplexer indicator after the name carries no layout.
    let name = head
        .split_whitespace()
        .next()
        .ok_or("SG_ is missing the signal name")?;

    let body = body.trim_start();
    let (layout, body) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    let (start, layout_rest) = layout
        .split_once('|')
        .ok_or_else(|| format!("bad bit layout '{layout}'"))?;
    let (length, order) = layout_rest
        .split_once('@')
        .ok_or_else(|| format!("bad bit layout '{layout}'"))?;
    let mut order = order.chars();
    let is_big_endian = match order.next() {
        Some('0') => true,
        Some('1') => false,
        _ => return Err(format!("bad byte order in '{layout}'")),
    };
    let is_signed = match order.next() {
        Some('-') => true,
        Some('+') => false,
        _ => return Err(format!("bad value type in '{layout}'")),
    };

    let (scaling, body) = delimited(body, '(', ')')?;
    let (factor, offset) = scaling
        .split_once(',')
        .ok_or_else(|| format!("bad scaling '({scaling})'"))?;
    let (range, body) = delimited(body, '[', ']')?;
    let (min, max) = range
        .split_once('|')
        .ok_or_else(|| format!("bad range '[{range}]'"))?;
    let (unit, _receivers) = delimited(body, '"', '"')?;

    Ok(Signal {
        name: name.to_string(),
        start_bit: number(start, "start bit")?,
        bit_length: number(length, "bit length")?,
        is_big_endian,
        is_signed,
        factor: number(factor, "factor")?,
        offset: number(offset, "offset")?,
        min: number(min, "min")?,
        max: number(max, "max")?,
        unit: normalize_unit(unit.to_string()),
    })
}

/// `"GenMsgCycleTime" BO_ <id> <ms>;` → `(id, ms)`. Other attributes yield `None`.
fn parse_cycle_time(rest: &str) -> Option<(MessageId, u32)> {
    let mut tokens = rest.trim_end_matches(';').split_whitespace();
    if tokens.next()? != "\"GenMsgCycleTime\"" || tokens.next()? != "BO_" {
        return None;
    }
    let id = parse_id(tokens.next()?).ok()?;
    let ms = tokens.next()?.parse().ok()?;
    Some((id, ms))
}

/// Split `<open>inner<close>rest` into `(inner, rest)`, skipping leading space.
fn delimited(text: &str, open: char, close: char) -> std::result::Result<(&str, &str), String> {
    let text = text.trim_start();
    let inner = text
        .strip_prefix(open)
        .ok_or_else(|| format!("expected '{open}' at '{text}'"))?;
    inner
        .split_once(close)
        .ok_or_else(|| format!("unterminated '{open}'"))
}

fn number<T: std::str::FromStr>(value: &str, what: &str) -> std::result::Result<T, String> {
    let value = value.trim();
    value
        .parse()
        .map_err(|_| format!("{what} '{value}' is not a valid number"))
}
