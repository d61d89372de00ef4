//! Message- and signal-level comparison of two specifications.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use canspec_core::{Message, MessageId, Signal, Specification};

use crate::policy::DiffConfig;
use crate::types::{ChangeCategory, Diff};

/// Diff two specifications with the default configuration.
pub fn diff_specs(old: &Specification, new: &Specification) -> Vec<Diff> {
    diff(old, new, &DiffConfig::default())
}

/// Compute every structural difference between `old` and `new`.
///
/// Old messages are walked in order (removed or modified, their signals in
/// old order followed by new-only signals), then new-only messages in new
/// order. An added or removed message is a single diff unless
/// [`DiffConfig::expand_messages`] is set. Swapping the inputs yields the
/// same entities with added and removed swapped.
pub fn diff(old: &Specification, new: &Specification, config: &DiffConfig) -> Vec<Diff> {
    let old_index: HashMap<MessageId, &Message> =
        old.messages().iter().map(|m| (m.id, m)).collect();
    let new_index: HashMap<MessageId, &Message> =
        new.messages().iter().map(|m| (m.id, m)).collect();
    let mut out = DiffWriter {
        config,
        diffs: Vec::new(),
    };

    for old_msg in old.messages() {
        match new_index.get(&old_msg.id) {
            Some(new_msg) => out.compare_messages(old_msg, new_msg),
            None => out.message_removed(old_msg),
        }
    }
    for new_msg in new.messages() {
        if !old_index.contains_key(&new_msg.id) {
            out.message_added(new_msg);
        }
    }

    debug!(
        old_messages = old.message_count(),
        new_messages = new.message_count(),
        diffs = out.diffs.len(),
        "computed specification diff"
    );
    out.diffs
}

struct DiffWriter<'c> {
    config: &'c DiffConfig,
    diffs: Vec<Diff>,
}

/// Where a signal diff sits: the owning message's id, label and subsystem.
struct Scope {
    id: MessageId,
    label: String,
    subsystem: Option<String>,
}

impl DiffWriter<'_> {
    fn push(&mut self, diff: Diff) {
        let severity = self.config.severity.severity_for(diff.category);
        self.diffs.push(diff.with_severity(severity));
    }

    fn subsystem(&self, a: Option<&Message>, b: Option<&Message>) -> Option<String> {
        self.config.subsystems.resolve_either(
            a.and_then(|m| m.transmitter.as_deref()),
            b.and_then(|m| m.transmitter.as_deref()),
        )
    }

    fn message_added(&mut self, message: &Message) {
        let scope = Scope {
            id: message.id,
            label: message.label(),
            subsystem: self.subsystem(Some(message), None),
        };
        self.push(
            Diff::new(ChangeCategory::MessageAdded, scope.label.clone(), message.id)
                .with_values(None, Some(describe_message(message)))
                .with_subsystem(scope.subsystem.clone())
                .with_summary(format!("Message {} added", qualified(message))),
        );
        if self.config.expand_messages {
            for signal in unique_signals(message) {
                self.signal_added(&scope, signal);
            }
        }
    }

    fn message_removed(&mut self, message: &Message) {
        let scope = Scope {
            id: message.id,
            label: message.label(),
            subsystem: self.subsystem(None, Some(message)),
        };
        self.push(
            Diff::new(ChangeCategory::MessageRemoved, scope.label.clone(), message.id)
                .with_values(Some(describe_message(message)), None)
                .with_subsystem(scope.subsystem.clone())
                .with_summary(format!("Message {} removed", qualified(message))),
        );
        if self.config.expand_messages {
            for signal in unique_signals(message) {
                self.signal_removed(&scope, signal);
            }
        }
    }

    fn compare_messages(&mut self, old: &Message, new: &Message) {
        let label = if old.name == new.name {
            old.label()
        } else {
            old.id.to_string()
        };
        let scope = Scope {
            id: old.id,
            label,
            subsystem: self.subsystem(Some(old), Some(new)),
        };

        let attributes = [
            (
                ChangeCategory::NameChanged,
                "name",
                non_empty(&old.name),
                non_empty(&new.name),
            ),
            (
                ChangeCategory::ByteLengthChanged,
                "byteLength",
                Some(old.byte_length.to_string()),
                Some(new.byte_length.to_string()),
            ),
            (
                ChangeCategory::TransmitterChanged,
                "transmitter",
                old.transmitter.clone(),
                new.transmitter.clone(),
            ),
            (
                ChangeCategory::CycleTimeChanged,
                "cycleTime",
                old.cycle_time_ms.map(|ms| ms.to_string()),
                new.cycle_time_ms.map(|ms| ms.to_string()),
            ),
        ];
        for (category, attribute, before, after) in attributes {
            if before != after {
                self.push(
                    Diff::new(category, scope.label.clone(), scope.id)
                        .with_attribute(attribute)
                        .with_subsystem(scope.subsystem.clone())
                        .with_summary(format!(
                            "Message {} {attribute} changed from {} to {}",
                            scope.label,
                            show(&before),
                            show(&after)
                        ))
                        .with_values(before, after),
                );
            }
        }

        let new_signals: HashMap<&str, &Signal> = index_signals(new);
        let old_signals: HashMap<&str, &Signal> = index_signals(old);

        for old_signal in unique_signals(old) {
            match new_signals.get(old_signal.name.as_str()) {
                Some(new_signal) => self.compare_signals(&scope, old_signal, new_signal),
                None => self.signal_removed(&scope, old_signal),
            }
        }
        for new_signal in unique_signals(new) {
            if !old_signals.contains_key(new_signal.name.as_str()) {
                self.signal_added(&scope, new_signal);
            }
        }
    }

    fn signal_added(&mut self, scope: &Scope, signal: &Signal) {
        self.push(
            Diff::new(ChangeCategory::SignalAdded, signal.name.clone(), scope.id)
                .with_values(None, Some(describe_signal(signal)))
                .with_subsystem(scope.subsystem.clone())
                .with_summary(format!(
                    "Signal {} added to message {}",
                    signal.name, scope.label
                )),
        );
    }

    fn signal_removed(&mut self, scope: &Scope, signal: &Signal) {
        self.push(
            Diff::new(ChangeCategory::SignalRemoved, signal.name.clone(), scope.id)
                .with_values(Some(describe_signal(signal)), None)
                .with_subsystem(scope.subsystem.clone())
                .with_summary(format!(
                    "Signal {} removed from message {}",
                    signal.name, scope.label
                )),
        );
    }

    fn compare_signals(&mut self, scope: &Scope, old: &Signal, new: &Signal) {
        let layout_details = format!("{} -> {}", old.layout_label(), new.layout_label());
        let scaling_details = format!("{} -> {}", scaling_label(old), scaling_label(new));

        let changes = [
            (
                ChangeCategory::BitLayoutChanged,
                "startBit",
                Some(old.start_bit.to_string()),
                Some(new.start_bit.to_string()),
            ),
            (
                ChangeCategory::BitLayoutChanged,
                "bitLength",
                Some(old.bit_length.to_string()),
                Some(new.bit_length.to_string()),
            ),
            (
                ChangeCategory::BitLayoutChanged,
                "byteOrder",
                Some(old.byte_order().to_string()),
                Some(new.byte_order().to_string()),
            ),
            (
                ChangeCategory::BitLayoutChanged,
                "isSigned",
                Some(old.is_signed.to_string()),
                Some(new.is_signed.to_string()),
            ),
            float_change("factor", old.factor, new.factor),
            float_change("offset", old.offset, new.offset),
            float_change("min", old.min, new.min),
            float_change("max", old.max, new.max),
            (
                ChangeCategory::UnitChanged,
                "unit",
                old.unit.clone(),
                new.unit.clone(),
            ),
        ];

        for (category, attribute, before, after) in changes {
            if before == after {
                continue;
            }
            let mut diff = Diff::new(category, old.name.clone(), scope.id)
                .with_attribute(attribute)
                .with_subsystem(scope.subsystem.clone())
                .with_summary(format!(
                    "Signal {} {attribute} changed from {} to {} in message {}",
                    old.name,
                    show(&before),
                    show(&after),
                    scope.label
                ))
                .with_values(before, after);
            match category {
                ChangeCategory::BitLayoutChanged => diff = diff.with_details(&layout_details),
                ChangeCategory::ScalingChanged => diff = diff.with_details(&scaling_details),
                _ => {}
            }
            self.push(diff);
        }
    }
}

type Change = (ChangeCategory, &'static str, Option<String>, Option<String>);

/// A scaling attribute change, or an unchanged placeholder when the values
/// compare equal (NaN equals NaN here).
fn float_change(attribute: &'static str, old: f64, new: f64) -> Change {
    let same = old == new || (old.is_nan() && new.is_nan());
    let before = Some(old.to_string());
    let after = if same {
        before.clone()
    } else {
        Some(new.to_string())
    };
    (ChangeCategory::ScalingChanged, attribute, before, after)
}

/// Signals by name; the first occurrence of a duplicated name wins.
fn index_signals(message: &Message) -> HashMap<&str, &Signal> {
    let mut index = HashMap::new();
    for signal in &message.signals {
        index.entry(signal.name.as_str()).or_insert(signal);
    }
    index
}

/// Signals in source order, skipping later duplicates of a name.
fn unique_signals(message: &Message) -> impl Iterator<Item = &Signal> {
    let mut seen = HashSet::new();
    message
        .signals
        .iter()
        .filter(move |s| seen.insert(s.name.as_str()))
}

fn qualified(message: &Message) -> String {
    if message.name.is_empty() {
        message.id.to_string()
    } else {
        format!("{} ({})", message.name, message.id)
    }
}

fn describe_message(message: &Message) -> String {
    format!(
        "{}, {} bytes, {} signals",
        qualified(message),
        message.byte_length,
        message.signals.len()
    )
}

fn describe_signal(signal: &Signal) -> String {
    let mut text = format!("{} {}", signal.layout_label(), scaling_label(signal));
    if let Some(unit) = &signal.unit {
        text.push(' ');
        text.push_str(unit);
    }
    text
}

fn scaling_label(signal: &Signal) -> String {
    format!(
        "({},{}) [{}|{}]",
        signal.factor, signal.offset, signal.min, signal.max
    )
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(none)")
}
