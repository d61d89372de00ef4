//! Persistence seam for specifications, diff records and import records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use canspec_core::{fingerprint, Specification};
use canspec_diff::Diff;

use crate::error::Result;
use crate::record::{ImportId, ImportRecord, SpecId, SpecMetadata};

/// A canonical specification as persisted after a successful import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSpecification {
    pub id: SpecId,
    pub metadata: SpecMetadata,
    pub specification: Specification,
    /// Hex SHA-256 of the canonical content.
    pub fingerprint: String,
    pub imported_at: DateTime<Utc>,
}

impl StoredSpecification {
    pub fn new(id: SpecId, metadata: SpecMetadata, specification: Specification) -> Result<Self> {
        Ok(Self {
            id,
            fingerprint: fingerprint(&specification)?,
            metadata,
            specification,
            imported_at: Utc::now(),
        })
    }
}

/// Diffs between two stored specifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRecord {
    pub old: SpecId,
    pub new: SpecId,
    pub diffs: Vec<Diff>,
    pub created_at: DateTime<Utc>,
}

/// Saves and loads records by identifier.
///
/// Loads return `Ok(None)` for unknown ids; `Err` is reserved for backend
/// failures.
pub trait SpecStore: Send + Sync {
    fn save_spec(&self, spec: StoredSpecification) -> Result<()>;

    fn load_spec(&self, id: SpecId) -> Result<Option<StoredSpecification>>;

    fn save_diff(&self, record: DiffRecord) -> Result<()>;

    fn load_diff(&self, old: SpecId, new: SpecId) -> Result<Option<DiffRecord>>;

    fn save_import(&self, record: ImportRecord) -> Result<()>;

    fn load_import(&self, id: ImportId) -> Result<Option<ImportRecord>>;
}

/// Process-local store backed by reader/writer-locked maps.
#[derive(Debug, Default)]
pub struct InMemorySpecStore {
    specs: RwLock<HashMap<SpecId, StoredSpecification>>,
    diffs: RwLock<HashMap<(SpecId, SpecId), DiffRecord>>,
    imports: RwLock<HashMap<ImportId, ImportRecord>>,
}

impl InMemorySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spec_count(&self) -> usize {
        self.specs.read().len()
    }

    pub fn diff_count(&self) -> usize {
        self.diffs.read().len()
    }
}

impl SpecStore for InMemorySpecStore {
    fn save_spec(&self, spec: StoredSpecification) -> Result<()> {
        self.specs.write().insert(spec.id, spec);
        Ok(())
    }

    fn load_spec(&self, id: SpecId) -> Result<Option<StoredSpecification>> {
        Ok(self.specs.read().get(&id).cloned())
    }

    fn save_diff(&self, record: DiffRecord) -> Result<()> {
        self.diffs.write().insert((record.old, record.new), record);
        Ok(())
    }

    fn load_diff(&self, old: SpecId, new: SpecId) -> Result<Option<DiffRecord>> {
        Ok(self.diffs.read().get(&(old, new)).cloned())
    }

    fn save_import(&self, record: ImportRecord) -> Result<()> {
        self.imports.write().insert(record.id, record);
        Ok(())
    }

    fn load_import(&self, id: ImportId) -> Result<Option<ImportRecord>> {
        Ok(self.imports.read().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canspec_core::{Message, Signal};
    use uuid::Uuid;

    fn stored() -> StoredSpecification {
        StoredSpecification::new(
            Uuid::new_v4(),
            SpecMetadata::new("powertrain.csv", "csv"),
            Specification::new(vec![
                Message::new(0x100, "Engine").with_signal(Signal::new("Rpm", 0, 16))
            ]),
        )
        .unwrap()
    }

    #[test]
    fn spec_round_trip() {
        let store = InMemorySpecStore::new();
        let spec = stored();
        let id = spec.id;
        assert_eq!(spec.fingerprint.len(), 64);
        store.save_spec(spec.clone()).unwrap();
        assert_eq!(store.load_spec(id).unwrap(), Some(spec));
        assert_eq!(store.load_spec(Uuid::new_v4()).unwrap(), None);
        assert_eq!(store.spec_count(), 1);
    }

    #[test]
    fn diff_records_keyed_by_direction() {
        let store = InMemorySpecStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .save_diff(DiffRecord {
                old: a,
                new: b,
                diffs: Vec::new(),
                created_at: Utc::now(),
            })
            .unwrap();
        assert!(store.load_diff(a, b).unwrap().is_some());
        assert!(store.load_diff(b, a).unwrap().is_none());
    }

    #[test]
    fn import_records_overwrite() {
        let store = InMemorySpecStore::new();
        let mut record = ImportRecord::new(SpecMetadata::new("x.json", "json"));
        store.save_import(record.clone()).unwrap();
        record.start_parsing().unwrap();
        store.save_import(record.clone()).unwrap();
        assert_eq!(store.load_import(record.id).unwrap(), Some(record));
    }
}
