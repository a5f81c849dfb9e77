//! Configuration management for watchevents
//!
//! Handles loading and validation of TOML configuration. Every field has a
//! default, so an empty file (or no file) is a valid configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LogConfig;
use crate::pathology::{DEFAULT_DUPLICATE_EVENT_THRESHOLD, TopologyMode};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Staleness window settings
    #[serde(default)]
    pub window: WindowConfig,

    /// Classification settings
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Known event patterns
    #[serde(default)]
    pub pathology: PathologyConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-friendly output
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Optional log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Staleness window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Events older than process start minus this many minutes are dropped
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_minutes: default_lookback_minutes(),
        }
    }
}

fn default_lookback_minutes() -> u64 {
    15
}

/// Longest accepted lookback: one week.
pub const MAX_LOOKBACK_MINUTES: u64 = 7 * 24 * 60;

/// Classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Repeat count above which an event is pathological
    #[serde(default = "default_duplicate_event_threshold")]
    pub duplicate_event_threshold: i32,

    /// Message substring that forces a single event to be interesting
    #[serde(default = "default_sandbox_marker")]
    pub sandbox_marker: String,

    /// Upper bound on a node label lookup
    #[serde(default = "default_node_lookup_timeout_ms")]
    pub node_lookup_timeout_ms: u64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            duplicate_event_threshold: default_duplicate_event_threshold(),
            sandbox_marker: default_sandbox_marker(),
            node_lookup_timeout_ms: default_node_lookup_timeout_ms(),
        }
    }
}

fn default_duplicate_event_threshold() -> i32 {
    DEFAULT_DUPLICATE_EVENT_THRESHOLD
}

fn default_sandbox_marker() -> String {
    "pod sandbox".to_string()
}

fn default_node_lookup_timeout_ms() -> u64 {
    5_000
}

/// Known event patterns, split the same way the rule library is.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathologyConfig {
    #[serde(default)]
    pub steady_state: Vec<MatcherConfig>,

    #[serde(default)]
    pub upgrade: Vec<MatcherConfig>,
}

/// One matcher as written in config. Patterns are regexes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatcherConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<TopologyMode>,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.lookback_minutes == 0 {
            return Err(ConfigError::Invalid(
                "window.lookback_minutes must be > 0".to_string(),
            ));
        }
        if self.window.lookback_minutes > MAX_LOOKBACK_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "window.lookback_minutes must be <= {MAX_LOOKBACK_MINUTES}"
            )));
        }
        if self.classification.node_lookup_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "classification.node_lookup_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.classification.sandbox_marker.is_empty() {
            return Err(ConfigError::Invalid(
                "classification.sandbox_marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Staleness lookback as a signed duration for timestamp arithmetic.
    ///
    /// Values past [`MAX_LOOKBACK_MINUTES`] are capped; `validate` rejects them.
    #[must_use]
    pub fn lookback(&self) -> chrono::Duration {
        let minutes = self.window.lookback_minutes.min(MAX_LOOKBACK_MINUTES);
        i64::try_from(minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or_else(chrono::Duration::zero)
    }

    #[must_use]
    pub fn node_lookup_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.classification.node_lookup_timeout_ms)
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.general.log_level.clone(),
            format: self.general.log_format,
            file: self.general.log_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.window.lookback_minutes, 15);
        assert_eq!(config.classification.duplicate_event_threshold, 20);
        assert_eq!(config.classification.sandbox_marker, "pod sandbox");
        assert!(config.validate().is_ok());
        assert_eq!(config.lookback(), chrono::Duration::minutes(15));
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.classification.node_lookup_timeout_ms, 5_000);
        assert!(config.pathology.steady_state.is_empty());
    }

    #[test]
    fn parses_full_file() {
        let config = Config::from_toml_str(
            r#"
            [general]
            log_level = "debug"
            log_format = "json"

            [window]
            lookback_minutes = 30

            [classification]
            duplicate_event_threshold = 5

            [[pathology.steady_state]]
            name = "etcd-probe"
            locator = "ns/openshift-etcd"
            reason = "^Unhealthy$"

            [[pathology.upgrade]]
            name = "sno-leader"
            message = "leader election"
            topology = "single_replica"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.log_format, LogFormat::Json);
        assert_eq!(config.lookback(), chrono::Duration::minutes(30));
        assert_eq!(config.classification.duplicate_event_threshold, 5);
        assert_eq!(config.classification.sandbox_marker, "pod sandbox");
        assert_eq!(config.pathology.steady_state[0].name, "etcd-probe");
        assert_eq!(
            config.pathology.upgrade[0].topology,
            Some(TopologyMode::SingleReplica)
        );
        assert_eq!(config.log_config().level, "debug");
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let err = Config::from_toml_str("[window]\nlookback_minutes = 0\n").unwrap_err();
        assert!(err.to_string().contains("lookback_minutes"));
    }

    #[test]
    fn oversized_lookback_is_rejected() {
        let err = Config::from_toml_str("[window]\nlookback_minutes = 1000000000000\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(ConfigError::Invalid(_))));
        assert!(err.to_string().contains("lookback_minutes"));

        let config = Config::from_toml_str("[window]\nlookback_minutes = 10080\n").unwrap();
        assert_eq!(config.lookback(), chrono::Duration::days(7));
    }

    #[test]
    fn lookback_is_capped_when_unvalidated() {
        let mut config = Config::default();
        config.window.lookback_minutes = u64::MAX;
        assert!(config.validate().is_err());
        assert_eq!(config.lookback(), chrono::Duration::days(7));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = Config::from_toml_str("[window\n").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[classification]\nnode_lookup_timeout_ms = 250").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(
            config.node_lookup_timeout(),
            std::time::Duration::from_millis(250)
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load_from(Path::new("/nonexistent/watchevents.toml")).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::ReadFailed { .. })
        ));
    }
}
