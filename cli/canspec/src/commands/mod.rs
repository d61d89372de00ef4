//! CLI command implementations.

pub mod check;
pub mod diff;
pub mod parse;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use canspec_import::{ImportRequest, ImportResult, ImportService, InMemorySpecStore, SpecId};
use canspec_parse::SpecFormat;

use crate::config::CanspecConfig;

/// A specification file read from disk with its resolved format.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub format: SpecFormat,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Read `path`, taking the format from `format` or else the file extension.
    pub fn read(path: &Path, format: Option<&str>) -> Result<Self> {
        let format = match format {
            Some(tag) => tag.parse::<SpecFormat>()?,
            None => SpecFormat::from_path(path).with_context(|| {
                format!(
                    "cannot infer the format of {} from its extension; pass a format tag",
                    path.display()
                )
            })?,
        };
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self {
            name: path.display().to_string(),
            format,
            bytes,
        })
    }
}

/// Two imported specifications in a fresh in-memory store.
pub struct ImportedPair {
    pub service: ImportService<InMemorySpecStore>,
    pub old: SpecId,
    pub new: SpecId,
    /// Import result of `new`, diffed against `old`.
    pub result: ImportResult,
}

/// Import `old`, then `new` with `old` as its baseline.
pub fn import_pair(config: &CanspecConfig, old: SourceFile, new: SourceFile) -> Result<ImportedPair> {
    let service = ImportService::with_config(InMemorySpecStore::new(), config.diff_config());
    let old_result = import(&service, old, None)?;
    let old_id = spec_id(&old_result)?;
    let result = import(&service, new, Some(old_id))?;
    let new_id = spec_id(&result)?;
    Ok(ImportedPair {
        service,
        old: old_id,
        new: new_id,
        result,
    })
}

fn import(
    service: &ImportService<InMemorySpecStore>,
    source: SourceFile,
    baseline: Option<SpecId>,
) -> Result<ImportResult> {
    let name = source.name.clone();
    let mut request = ImportRequest::new(source.name, source.format.tag(), source.bytes);
    if let Some(baseline) = baseline {
        request = request.with_baseline(baseline);
    }
    let result = service
        .import(request)
        .with_context(|| format!("importing {name}"))?;
    if !result.success {
        bail!(
            "{name}: {}",
            result.error_message.as_deref().unwrap_or("import failed")
        );
    }
    Ok(result)
}

fn spec_id(result: &ImportResult) -> Result<SpecId> {
    result
        .spec_id
        .context("completed import carries no specification id")
}
