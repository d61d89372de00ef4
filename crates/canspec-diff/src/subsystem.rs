//! Transmitter to vehicle-subsystem lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maps transmitting node names to the subsystem that owns them.
///
/// Keys match case-insensitively, either exactly or as a prefix that ends at
/// a `_` or `-` in the transmitter name, so `ADAS` covers `ADAS_CTRL` and
/// `ADAS-CAM` but not `ADASX`. The longest matching prefix wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsystemMap {
    entries: BTreeMap<String, String>,
}

impl SubsystemMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a transmitter key.
    pub fn with(mut self, key: impl Into<String>, subsystem: impl Into<String>) -> Self {
        self.insert(key, subsystem);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, subsystem: impl Into<String>) {
        self.entries.insert(key.into(), subsystem.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The subsystem owning `transmitter`, if any key matches.
    pub fn resolve(&self, transmitter: &str) -> Option<&str> {
        let transmitter = transmitter.trim();
        if transmitter.is_empty() {
            return None;
        }

        if let Some((_, subsystem)) = self
            .entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(transmitter))
        {
            return Some(subsystem);
        }

        self.entries
            .iter()
            .filter(|(key, _)| is_boundary_prefix(key, transmitter))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, subsystem)| subsystem.as_str())
    }

    /// Subsystem for a message seen under two transmitters.
    ///
    /// The argument order does not matter: when both resolve to different
    /// subsystems the lexicographically smaller label is used.
    pub fn resolve_either(&self, a: Option<&str>, b: Option<&str>) -> Option<String> {
        let a = a.and_then(|t| self.resolve(t));
        let b = b.and_then(|t| self.resolve(t));
        match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
        .map(str::to_string)
    }
}

fn is_boundary_prefix(key: &str, transmitter: &str) -> bool {
    let (Some(head), Some(rest)) = (transmitter.get(..key.len()), transmitter.get(key.len()..))
    else {
        return false;
    };
    !key.is_empty() && head.eq_ignore_ascii_case(key) && rest.starts_with(['_', '-'])
}
