//! `canspec.toml` configuration and consumer files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use canspec_compat::{load_consumers, Consumer};
use canspec_diff::{DiffConfig, SeverityPolicy, SubsystemMap};
use canspec_import::DEFAULT_CONTEXT;

/// File name searched for when `--config` is not given.
pub const CONFIG_FILE: &str = "canspec.toml";

/// The top-level configuration. Every table is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanspecConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Transmitter node name → subsystem.
    #[serde(default)]
    pub subsystems: SubsystemMap,
    /// Per-category severity overrides.
    #[serde(default)]
    pub severity: SeverityPolicy,
}

/// `[analysis]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Cache context for compatibility assessments.
    #[serde(default = "default_context")]
    pub context: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
        }
    }
}

fn default_context() -> String {
    DEFAULT_CONTEXT.to_string()
}

impl CanspecConfig {
    /// Search upward from `start_dir` for a `canspec.toml` and parse it,
    /// returning the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing canspec.toml")
    }

    /// Diff engine inputs taken from `[subsystems]` and `[severity]`.
    pub fn diff_config(&self) -> DiffConfig {
        DiffConfig::new(self.subsystems.clone()).with_severity(self.severity.clone())
    }
}

/// Read a consumers file of `[[consumer]]` tables.
pub fn load_consumers_file(path: &Path) -> Result<Vec<Consumer>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    load_consumers(&content).with_context(|| format!("parsing {}", path.display()))
}
