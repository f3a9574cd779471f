//! Asset context configuration
//!
//! Configuration can be built in code or read from RON or JSON files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::MatchPolicy;

/// What a multi-name load does when some names match nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// Load whatever matched; fail only if nothing matched
    #[default]
    BestEffort,
    /// Fail unless every name matched
    Strict,
}

/// How label scans run during initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// All scans in flight at once
    #[default]
    Concurrent,
    /// One scan after another, in submission order
    Sequential,
}

/// Asset context configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Multi-name load behaviour
    pub lookup_mode: LookupMode,
    /// Name matching against locator keys
    pub match_policy: MatchPolicy,
    /// Label scan scheduling
    pub scan_mode: ScanMode,
    /// Scope that loads are tracked under until another is entered
    pub default_scope: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            lookup_mode: LookupMode::BestEffort,
            match_policy: MatchPolicy::ExactThenSubstring,
            scan_mode: ScanMode::Concurrent,
            default_scope: String::from("scene"),
        }
    }
}

impl AssetConfig {
    /// Set the lookup mode
    #[must_use]
    pub fn with_lookup_mode(mut self, mode: LookupMode) -> Self {
        self.lookup_mode = mode;
        self
    }

    /// Set the match policy
    #[must_use]
    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    /// Set the scan mode
    #[must_use]
    pub fn with_scan_mode(mut self, mode: ScanMode) -> Self {
        self.scan_mode = mode;
        self
    }

    /// Set the default scope name
    #[must_use]
    pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scope = scope.into();
        self
    }

    /// Parse configuration from a RON string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid configuration
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        ron::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid configuration
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Errors that can occur while reading configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_ron_roundtrip_keeps_fields() {
        let config = AssetConfig::default()
            .with_lookup_mode(LookupMode::Strict)
            .with_scan_mode(ScanMode::Sequential)
            .with_default_scope("level_1");

        let ron_str = config.to_ron_string().unwrap();
        assert!(ron_str.contains("level_1"));

        let loaded = AssetConfig::from_ron_str(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_json_partial_uses_defaults() {
        let json = r#"{ "lookup_mode": "strict", "match_policy": "substring" }"#;
        let config = AssetConfig::from_json_str(json).unwrap();

        assert_eq!(config.lookup_mode, LookupMode::Strict);
        assert_eq!(config.match_policy, MatchPolicy::Substring);
        assert_eq!(config.scan_mode, ScanMode::Concurrent);
        assert_eq!(config.default_scope, "scene");
    }

    #[test]
    fn test_config_parse_error() {
        let err = AssetConfig::from_ron_str("(lookup_mode: Sometimes)").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AssetConfig::load_json("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
