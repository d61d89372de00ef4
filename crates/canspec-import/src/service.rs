//! Import orchestration: parse, persist, diff and assess.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use canspec_compat::{
    analyze, escalate_consumed_removals, find_impacted_consumers, AssessmentCache, CacheKey,
    CacheStats, CompatibilityStatus, Consumer, ImpactedConsumer,
};
use canspec_core::MessageId;
use canspec_diff::{diff, summarize, ChangeType, Diff, DiffConfig, DiffSummary, EntityType};
use canspec_parse::{parse_with, ParseOptions, ParseOutcome, SpecFormat};

use crate::error::{ImportError, Result};
use crate::record::{ImportId, ImportRecord, SpecId, SpecMetadata};
use crate::store::{DiffRecord, SpecStore, StoredSpecification};

/// Cache context used when the caller names none.
pub const DEFAULT_CONTEXT: &str = "default";

/// Raw bytes plus everything needed to import them.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub bytes: Vec<u8>,
    pub metadata: SpecMetadata,
    /// Previously imported specification to diff against.
    pub baseline: Option<SpecId>,
    pub options: ParseOptions,
}

impl ImportRequest {
    pub fn new(
        source_name: impl Into<String>,
        format_tag: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            metadata: SpecMetadata::new(source_name, format_tag),
            baseline: None,
            options: ParseOptions::default(),
        }
    }

    pub fn with_baseline(mut self, baseline: SpecId) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }
}

/// Outcome of one import, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub import_id: ImportId,
    pub spec_id: Option<SpecId>,
    pub success: bool,
    pub error_message: Option<String>,
    pub message_count: usize,
    pub signal_count: usize,
    /// Diffs against the baseline, when one was named.
    pub diffs: Vec<Diff>,
    pub diff_summary: Option<DiffSummary>,
    /// Layout issues and skipped rows.
    pub warnings: Vec<String>,
}

impl ImportResult {
    fn failed(import_id: ImportId, error_message: String) -> Self {
        Self {
            import_id,
            spec_id: None,
            success: false,
            error_message: Some(error_message),
            message_count: 0,
            signal_count: 0,
            diffs: Vec::new(),
            diff_summary: None,
            warnings: Vec::new(),
        }
    }
}

/// Consumer impact for a pair of specifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerImpact {
    /// Diffs after consumed signal removals were escalated.
    pub diffs: Vec<Diff>,
    pub escalated_removals: usize,
    pub impacted_consumers: Vec<ImpactedConsumer>,
}

/// Drives imports against a [`SpecStore`] and answers diff and
/// compatibility queries over stored specifications.
pub struct ImportService<S> {
    store: S,
    config: DiffConfig,
    cache: AssessmentCache,
}

impl<S: SpecStore> ImportService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, DiffConfig::default())
    }

    pub fn with_config(store: S, config: DiffConfig) -> Self {
        Self {
            store,
            config,
            cache: AssessmentCache::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Import one source.
    ///
    /// Parse failures and unknown baselines are reported in the result and
    /// recorded as a failed import; `Err` means the store itself failed.
    /// A store failure after parsing still leaves the record `Failed`.
    pub fn import(&self, request: ImportRequest) -> Result<ImportResult> {
        let mut record = ImportRecord::new(request.metadata.clone());
        self.store.save_import(record.clone())?;
        record.start_parsing()?;
        self.store.save_import(record.clone())?;
        info!(
            import = %record.id,
            source = %request.metadata.source_name,
            format = %request.metadata.format,
            "import started"
        );

        let outcome = match parse_request(&request) {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(record, err),
        };

        let baseline = match request.baseline {
            Some(id) => match self.store.load_spec(id)? {
                Some(stored) => Some(stored),
                None => return self.fail(record, ImportError::SpecNotFound(id)),
            },
            None => None,
        };

        let ParseOutcome {
            specification,
            skipped_rows,
            layout_issues,
        } = outcome;
        let mut warnings: Vec<String> = layout_issues.iter().map(|i| i.to_string()).collect();
        warnings.extend(
            skipped_rows
                .iter()
                .map(|r| format!("skipped row {}: {}", r.row, r.detail)),
        );

        let spec_id = Uuid::new_v4();
        let diffs = baseline
            .as_ref()
            .map(|b| diff(&b.specification, &specification, &self.config))
            .unwrap_or_default();
        let message_count = specification.message_count();
        let signal_count = specification.signal_count();

        let stored = match StoredSpecification::new(spec_id, request.metadata, specification) {
            Ok(stored) => stored,
            Err(err) => return self.fail(record, err),
        };
        if let Err(err) = self.persist(stored, baseline.as_ref(), &diffs) {
            return Err(self.abort(record, err));
        }

        record.complete(spec_id, request.baseline)?;
        self.store.save_import(record.clone())?;
        info!(
            import = %record.id,
            spec = %spec_id,
            messages = message_count,
            signals = signal_count,
            diffs = diffs.len(),
            warnings = warnings.len(),
            "import completed"
        );

        Ok(ImportResult {
            import_id: record.id,
            spec_id: Some(spec_id),
            success: true,
            error_message: None,
            message_count,
            signal_count,
            diff_summary: baseline.as_ref().map(|_| summarize(&diffs)),
            diffs,
            warnings,
        })
    }

    fn fail(&self, mut record: ImportRecord, error: ImportError) -> Result<ImportResult> {
        let reason = error.to_string();
        warn!(import = %record.id, "import failed: {reason}");
        record.fail(reason.clone())?;
        self.store.save_import(record.clone())?;
        Ok(ImportResult::failed(record.id, reason))
    }

    fn persist(
        &self,
        spec: StoredSpecification,
        baseline: Option<&StoredSpecification>,
        diffs: &[Diff],
    ) -> Result<()> {
        let new = spec.id;
        self.store.save_spec(spec)?;
        if let Some(baseline) = baseline {
            self.store.save_diff(DiffRecord {
                old: baseline.id,
                new,
                diffs: diffs.to_vec(),
                created_at: Utc::now(),
            })?;
        }
        Ok(())
    }

    /// Mark the record failed on a store error, then hand the error back.
    fn abort(&self, mut record: ImportRecord, error: ImportError) -> ImportError {
        warn!(import = %record.id, "import aborted: {error}");
        let saved = record
            .fail(error.to_string())
            .and_then(|()| self.store.save_import(record.clone()));
        if let Err(err) = saved {
            warn!(import = %record.id, "failed import not recorded: {err}");
        }
        error
    }

    /// A stored specification by id.
    pub fn spec(&self, id: SpecId) -> Result<StoredSpecification> {
        self.store
            .load_spec(id)?
            .ok_or(ImportError::SpecNotFound(id))
    }

    /// Diffs from `old` to `new`, loaded from the store or computed and persisted.
    pub fn diffs_between(&self, old: SpecId, new: SpecId) -> Result<Vec<Diff>> {
        if let Some(record) = self.store.load_diff(old, new)? {
            return Ok(record.diffs);
        }
        let old_spec = self.spec(old)?;
        let new_spec = self.spec(new)?;
        let diffs = diff(&old_spec.specification, &new_spec.specification, &self.config);
        self.store.save_diff(DiffRecord {
            old,
            new,
            diffs: diffs.clone(),
            created_at: Utc::now(),
        })?;
        Ok(diffs)
    }

    /// Compatibility of `new` relative to `old`, cached per `(old, new, context)`.
    pub fn compatibility(
        &self,
        old: SpecId,
        new: SpecId,
        context: &str,
        force_refresh: bool,
    ) -> Result<CompatibilityStatus> {
        let key = CacheKey::new(old, new, context);
        let assessment = self.cache.try_get_or_compute(key, force_refresh, || {
            let diffs = self.diffs_between(old, new)?;
            Ok::<_, ImportError>(analyze(&diffs))
        })?;
        Ok(CompatibilityStatus::from(&assessment))
    }

    /// Diffs escalated for consumed removals, and the consumers they hit.
    ///
    /// Signals of added or removed messages are matched against consumers
    /// as well, but only the stored diffs are escalated and returned.
    pub fn consumer_impact(
        &self,
        old: SpecId,
        new: SpecId,
        consumers: &[Consumer],
    ) -> Result<ConsumerImpact> {
        let mut diffs = self.diffs_between(old, new)?;
        let escalated_removals = escalate_consumed_removals(&mut diffs, consumers);

        let mut matched = diffs.clone();
        matched.extend(self.whole_message_signals(old, new, &diffs)?);
        let impacted_consumers = find_impacted_consumers(&matched, consumers);
        Ok(ConsumerImpact {
            diffs,
            escalated_removals,
            impacted_consumers,
        })
    }

    /// Signal diffs for the messages that `diffs` adds or removes outright.
    fn whole_message_signals(
        &self,
        old: SpecId,
        new: SpecId,
        diffs: &[Diff],
    ) -> Result<Vec<Diff>> {
        let whole: HashSet<MessageId> = diffs
            .iter()
            .filter(|d| {
                d.entity_type == EntityType::Message && d.change_type != ChangeType::Modified
            })
            .map(|d| d.message_id)
            .collect();
        if whole.is_empty() {
            return Ok(Vec::new());
        }
        let expanded = self.config.clone().with_expanded_messages();
        let old_spec = self.spec(old)?;
        let new_spec = self.spec(new)?;
        Ok(diff(&old_spec.specification, &new_spec.specification, &expanded)
            .into_iter()
            .filter(|d| d.entity_type == EntityType::Signal && whole.contains(&d.message_id))
            .collect())
    }

    /// An import record by id.
    pub fn import_record(&self, id: ImportId) -> Result<ImportRecord> {
        self.store
            .load_import(id)?
            .ok_or(ImportError::ImportNotFound(id))
    }

    /// Assessment cache usage.
    pub fn cache_statistics(&self) -> CacheStats {
        self.cache.statistics()
    }
}

fn parse_request(request: &ImportRequest) -> Result<ParseOutcome> {
    let format: SpecFormat = request.metadata.format.parse()?;
    Ok(parse_with(&request.bytes, format, &request.options)?)
}
