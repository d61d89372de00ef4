//! Diff configuration errors.

/// Errors raised while loading a diff configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
