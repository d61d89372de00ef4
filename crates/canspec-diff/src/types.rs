//! Diff record types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use canspec_core::MessageId;

/// Direction of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    /// The change seen from the other side: added and removed swap.
    pub fn mirrored(self) -> Self {
        match self {
            ChangeType::Added => ChangeType::Removed,
            ChangeType::Removed => ChangeType::Added,
            ChangeType::Modified => ChangeType::Modified,
        }
    }

    /// One-character prefix used by text renderings.
    pub fn marker(self) -> char {
        match self {
            ChangeType::Added => '+',
            ChangeType::Removed => '-',
            ChangeType::Modified => '~',
        }
    }
}

/// Kind of entity a diff is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Message,
    Signal,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Message => write!(f, "Message"),
            EntityType::Signal => write!(f, "Signal"),
        }
    }
}

/// How much a change matters to receivers. Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, least severe first.
    pub const ALL: [Severity; 5] = [
        Severity::Informational,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Informational => "Informational",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// High and Critical changes break existing receivers.
    pub fn is_breaking(self) -> bool {
        self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown severity '{s}'"))
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The closed set of change categories.
///
/// A category fixes both the change type and the entity type of a diff.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub enum ChangeCategory {
    MessageAdded,
    MessageRemoved,
    SignalAdded,
    SignalRemoved,
    NameChanged,
    ByteLengthChanged,
    TransmitterChanged,
    CycleTimeChanged,
    BitLayoutChanged,
    ScalingChanged,
    UnitChanged,
}

impl ChangeCategory {
    pub const ALL: [ChangeCategory; 11] = [
        ChangeCategory::MessageAdded,
        ChangeCategory::MessageRemoved,
        ChangeCategory::SignalAdded,
        ChangeCategory::SignalRemoved,
        ChangeCategory::NameChanged,
        ChangeCategory::ByteLengthChanged,
        ChangeCategory::TransmitterChanged,
        ChangeCategory::CycleTimeChanged,
        ChangeCategory::BitLayoutChanged,
        ChangeCategory::ScalingChanged,
        ChangeCategory::UnitChanged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeCategory::MessageAdded => "MessageAdded",
            ChangeCategory::MessageRemoved => "MessageRemoved",
            ChangeCategory::SignalAdded => "SignalAdded",
            ChangeCategory::SignalRemoved => "SignalRemoved",
            ChangeCategory::NameChanged => "NameChanged",
            ChangeCategory::ByteLengthChanged => "ByteLengthChanged",
            ChangeCategory::TransmitterChanged => "TransmitterChanged",
            ChangeCategory::CycleTimeChanged => "CycleTimeChanged",
            ChangeCategory::BitLayoutChanged => "BitLayoutChanged",
            ChangeCategory::ScalingChanged => "ScalingChanged",
            ChangeCategory::UnitChanged => "UnitChanged",
        }
    }

    pub fn change_type(self) -> ChangeType {
        match self {
            ChangeCategory::MessageAdded | ChangeCategory::SignalAdded => ChangeType::Added,
            ChangeCategory::MessageRemoved | ChangeCategory::SignalRemoved => ChangeType::Removed,
            _ => ChangeType::Modified,
        }
    }

    pub fn entity_type(self) -> EntityType {
        match self {
            ChangeCategory::MessageAdded
            | ChangeCategory::MessageRemoved
            | ChangeCategory::NameChanged
            | ChangeCategory::ByteLengthChanged
            | ChangeCategory::TransmitterChanged
            | ChangeCategory::CycleTimeChanged => EntityType::Message,
            ChangeCategory::SignalAdded
            | ChangeCategory::SignalRemoved
            | ChangeCategory::BitLayoutChanged
            | ChangeCategory::ScalingChanged
            | ChangeCategory::UnitChanged => EntityType::Signal,
        }
    }

    /// Severity assigned when no policy override applies.
    ///
    /// Removed signals start at `Low`; the consumer pass escalates the ones
    /// something downstream still reads.
    pub fn default_severity(self) -> Severity {
        match self {
            ChangeCategory::MessageRemoved | ChangeCategory::BitLayoutChanged => Severity::Critical,
            ChangeCategory::MessageAdded
            | ChangeCategory::NameChanged
            | ChangeCategory::ByteLengthChanged
            | ChangeCategory::TransmitterChanged
            | ChangeCategory::CycleTimeChanged => Severity::High,
            ChangeCategory::SignalAdded | ChangeCategory::ScalingChanged => Severity::Medium,
            ChangeCategory::SignalRemoved => Severity::Low,
            ChangeCategory::UnitChanged => Severity::Informational,
        }
    }

    /// Short phrase for findings and reports.
    pub fn describe(self) -> &'static str {
        match self {
            ChangeCategory::MessageAdded => "new message on the bus",
            ChangeCategory::MessageRemoved => "message removed from the bus",
            ChangeCategory::SignalAdded => "new signal in an existing message",
            ChangeCategory::SignalRemoved => "signal removed from a message",
            ChangeCategory::NameChanged => "message renamed",
            ChangeCategory::ByteLengthChanged => "message payload length changed",
            ChangeCategory::TransmitterChanged => "message transmitter changed",
            ChangeCategory::CycleTimeChanged => "message cycle time changed",
            ChangeCategory::BitLayoutChanged => "signal bit layout changed (wire-incompatible)",
            ChangeCategory::ScalingChanged => "signal scaling or range changed",
            ChangeCategory::UnitChanged => "signal unit changed",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChangeCategory::ALL
            .into_iter()
            .find(|cat| cat.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown change category '{s}'"))
    }
}

impl TryFrom<String> for ChangeCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One structural difference between two specifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub change_type: ChangeType,
    pub entity_type: EntityType,
    pub entity_name: String,
    /// The message the entity belongs to (or is).
    pub message_id: MessageId,
    /// Compared attribute for modified entities, e.g. `startBit`.
    pub attribute: Option<String>,
    pub category: ChangeCategory,
    pub severity: Severity,
    pub impacted_subsystem: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub summary: String,
    pub details: Option<String>,
}

impl Diff {
    /// A diff for `category` at its default severity. Change and entity
    /// types follow from the category.
    pub fn new(
        category: ChangeCategory,
        entity_name: impl Into<String>,
        message_id: impl Into<MessageId>,
    ) -> Self {
        Self {
            change_type: category.change_type(),
            entity_type: category.entity_type(),
            entity_name: entity_name.into(),
            message_id: message_id.into(),
            attribute: None,
            category,
            severity: category.default_severity(),
            impacted_subsystem: None,
            old_value: None,
            new_value: None,
            summary: String::new(),
            details: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn with_subsystem(mut self, subsystem: Option<String>) -> Self {
        self.impacted_subsystem = subsystem;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Low > Severity::Informational);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Critical));
        assert!(Severity::High.is_breaking());
        assert!(!Severity::Medium.is_breaking());
    }

    #[test]
    fn category_fixes_change_and_entity_type() {
        let d = Diff::new(ChangeCategory::BitLayoutChanged, "Torque", 0x120);
        assert_eq!(d.change_type, ChangeType::Modified);
        assert_eq!(d.entity_type, EntityType::Signal);
        assert_eq!(d.severity, Severity::Critical);

        let d = Diff::new(ChangeCategory::MessageAdded, "Status", 0x120);
        assert_eq!(d.change_type, ChangeType::Added);
        assert_eq!(d.entity_type, EntityType::Message);
    }

    #[test]
    fn categories_serialize_by_name() {
        for category in ChangeCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
            let back: ChangeCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
        assert!(serde_json::from_str::<ChangeCategory>("\"Renamed\"").is_err());
    }

    #[test]
    fn severity_parses_any_case() {
        assert_eq!("critical".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!(" Medium ".parse::<Severity>(), Ok(Severity::Medium));
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn diff_json_is_camel_case() {
        let d = Diff::new(ChangeCategory::UnitChanged, "Speed", 0x10)
            .with_attribute("unit")
            .with_values(Some("km/h".into()), Some("mph".into()));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["changeType"], "Modified");
        assert_eq!(json["entityType"], "Signal");
        assert_eq!(json["messageId"], 16);
        assert_eq!(json["oldValue"], "km/h");
        assert_eq!(json["impactedSubsystem"], serde_json::Value::Null);
    }
}
