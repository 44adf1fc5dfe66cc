//! Cache coordinator configuration.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Diagnostic verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DebugLevel {
    /// No diagnostics.
    #[default]
    Off,
    /// Diagnostics are logged.
    Log,
    /// Diagnostics are logged and mirrored into debug response headers.
    Headers,
}

impl TryFrom<u8> for DebugLevel {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Log),
            2 => Ok(Self::Headers),
            other => Err(ConfigError::InvalidDebugLevel(other)),
        }
    }
}

impl From<DebugLevel> for u8 {
    fn from(level: DebugLevel) -> Self {
        match level {
            DebugLevel::Off => 0,
            DebugLevel::Log => 1,
            DebugLevel::Headers => 2,
        }
    }
}

/// ESI layout-handle transport settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsiHandlesConfig {
    /// Layout handle name to short code.
    #[serde(default)]
    pub translator: BTreeMap<String, String>,
    /// Substrings marking handles that end encoding.
    #[serde(default)]
    pub ignored: Vec<String>,
}

/// Configuration consumed by the per-request cache coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControlConfig {
    /// Whether the coordinator is active at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Diagnostic verbosity.
    #[serde(default)]
    pub debug: DebugLevel,
    /// Vary-context keys excluded from fingerprinting.
    #[serde(default)]
    pub bypassed_context: Vec<String>,
    /// ESI handle codec settings.
    #[serde(default)]
    pub esi: EsiHandlesConfig,
}

fn default_true() -> bool {
    true
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: DebugLevel::Off,
            bypassed_context: Vec::new(),
            esi: EsiHandlesConfig::default(),
        }
    }
}

impl CacheControlConfig {
    /// Load and validate config from a file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the ESI codec relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut codes = HashSet::new();
        for (handle, code) in &self.esi.translator {
            if handle.is_empty() {
                return Err(ConfigError::Invalid(
                    "esi.translator contains an empty handle".to_string(),
                ));
            }
            if code.is_empty() || code.contains(',') {
                return Err(ConfigError::Invalid(format!(
                    "esi.translator code for '{}' must be non-empty and contain no ','",
                    handle
                )));
            }
            if !codes.insert(code.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "esi.translator code '{}' is used more than once",
                    code
                )));
            }
        }

        if self.esi.ignored.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid(
                "esi.ignored contains an empty substring".to_string(),
            ));
        }

        Ok(())
    }

    /// Config with the coordinator switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the debug level.
    pub fn with_debug(mut self, debug: DebugLevel) -> Self {
        self.debug = debug;
        self
    }

    /// Add a vary-context key to the bypass list.
    pub fn bypass_context(mut self, key: impl Into<String>) -> Self {
        self.bypassed_context.push(key.into());
        self
    }

    /// Add an ESI handle translation.
    pub fn translate_handle(mut self, handle: impl Into<String>, code: impl Into<String>) -> Self {
        self.esi.translator.insert(handle.into(), code.into());
        self
    }

    /// Add an ignored ESI handle substring.
    pub fn ignore_handle(mut self, substring: impl Into<String>) -> Self {
        self.esi.ignored.push(substring.into());
        self
    }
}
