//! Sandbox configuration file parsing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 256;
pub const DEFAULT_MAX_COLLECTION_SIZE: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs for one execution context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    /// Checked operations nested deeper than this fail with a range error.
    pub max_dispatch_depth: usize,
    /// Emit a `trace` event for every link of every dispatch.
    pub trace_dispatch: bool,
    /// Largest list or string a built-in may grow on behalf of a caller.
    pub max_collection_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
            trace_dispatch: false,
            max_collection_size: DEFAULT_MAX_COLLECTION_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    sandbox: SandboxConfig,
}

impl SandboxConfig {
    /// Load configuration from a TOML file.
    ///
    /// Expected format:
    /// ```toml
    /// [sandbox]
    /// max_dispatch_depth = 256
    /// trace_dispatch = false
    /// max_collection_size = 1048576
    /// ```
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string. Missing keys keep their defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.sandbox.validate()?;
        Ok(file.sandbox)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dispatch_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_dispatch_depth must be at least 1".to_string(),
            ));
        }
        if self.max_collection_size == 0 {
            return Err(ConfigError::Invalid(
                "max_collection_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(SandboxConfig::parse("").unwrap(), SandboxConfig::default());
    }

    #[test]
    fn test_parse_sandbox_table() {
        let c = SandboxConfig::parse("[sandbox]\nmax_dispatch_depth = 8\ntrace_dispatch = true\n")
            .unwrap();
        assert_eq!(c.max_dispatch_depth, 8);
        assert!(c.trace_dispatch);
        assert_eq!(c.max_collection_size, DEFAULT_MAX_COLLECTION_SIZE);
    }

    #[test]
    fn test_rejects_unknown_keys_and_zero_depth() {
        assert!(matches!(
            SandboxConfig::parse("[sandbox]\nmax_depth = 3\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SandboxConfig::parse("[sandbox]\nmax_dispatch_depth = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SandboxConfig::parse("[sandbox]\nmax_collection_size = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = SandboxConfig::load(Path::new("/nonexistent/sandbox.toml")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read config file /nonexistent/sandbox.toml"));
    }
}
