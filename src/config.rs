//! Runtime configuration
//!
//! Settings come from an optional JSON file, then `SONARA_*` environment
//! variables override individual fields. Missing file fields fall back to
//! their defaults.

use crate::error::{Result, SonaraError};
use crate::mapper::DEFAULT_CHANGE_LOG_CAPACITY;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_TIMEOUT_MS: u64 = 10_000;

/// Gemini rewriter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// No key means the rewriter is unconfigured
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL; the model name and `:generateContent` are appended
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_GEMINI_TIMEOUT_MS,
        }
    }
}

impl GeminiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Engine and collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonaraConfig {
    pub sample_rate: f64,
    pub block_size: usize,
    pub channels: usize,
    pub change_log_capacity: usize,
    /// Intensity used until the host sets one (0.0 to 2.0)
    pub default_intensity: f32,
    pub gemini: GeminiConfig,
}

impl Default for SonaraConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            block_size: 512,
            channels: 2,
            change_log_capacity: DEFAULT_CHANGE_LOG_CAPACITY,
            default_intensity: 1.0,
            gemini: GeminiConfig::default(),
        }
    }
}

impl SonaraConfig {
    /// Load from a JSON file without applying environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Optional file, then environment overrides
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SONARA_*` overrides that are set
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(key) = env::var("SONARA_GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Ok(model) = env::var("SONARA_GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Ok(endpoint) = env::var("SONARA_GEMINI_ENDPOINT") {
            self.gemini.endpoint = endpoint;
        }
        if let Some(timeout) = parse_env("SONARA_GEMINI_TIMEOUT_MS")? {
            self.gemini.timeout_ms = timeout;
        }
        if let Some(capacity) = parse_env("SONARA_CHANGE_LOG_CAPACITY")? {
            self.change_log_capacity = capacity;
        }
        if let Some(intensity) = parse_env("SONARA_DEFAULT_INTENSITY")? {
            self.default_intensity = intensity;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate > 0.0) {
            return Err(invalid("sample_rate", self.sample_rate, "> 0 Hz"));
        }
        if self.block_size == 0 {
            return Err(invalid("block_size", self.block_size, "> 0 samples"));
        }
        if self.channels == 0 {
            return Err(invalid("channels", self.channels, ">= 1"));
        }
        if self.change_log_capacity == 0 {
            return Err(invalid("change_log_capacity", self.change_log_capacity, ">= 1"));
        }
        if !(0.0..=2.0).contains(&self.default_intensity) {
            return Err(invalid("default_intensity", self.default_intensity, "0.0 to 2.0"));
        }
        if self.gemini.timeout_ms == 0 {
            return Err(invalid("gemini.timeout_ms", self.gemini.timeout_ms, "> 0 ms"));
        }
        Ok(())
    }
}

fn invalid(param: &str, value: impl ToString, expected: &str) -> SonaraError {
    SonaraError::InvalidParameter {
        param: param.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SonaraError::Config {
                reason: format!("{} has an invalid value: {}", name, raw),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SonaraConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.timeout_ms, 10_000);
        assert!(!config.gemini.is_configured());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sample_rate": 48000.0, "gemini": {{"api_key": "abc"}}}}"#
        )
        .unwrap();

        let config = SonaraConfig::load(file.path()).unwrap();

        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.block_size, 512);
        assert_eq!(config.gemini.api_key.as_deref(), Some("abc"));
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert!(config.gemini.is_configured());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_intensity": 3.5}}"#).unwrap();

        let err = SonaraConfig::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = SonaraConfig::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        let gemini = GeminiConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!gemini.is_configured());
    }
}
