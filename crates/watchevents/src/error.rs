//! Error types for watchevents

use std::fmt::Write;
use thiserror::Error;

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            alternatives: Vec::new(),
        }
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for watchevents
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Pathology matcher errors
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Config(err) => Some(err.remediation()),
            Self::Pattern(err) => Some(err.remediation()),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    ParseFailed(String),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::ReadFailed { path, .. } => {
                Remediation::new(format!("Make sure {path} exists and is readable."))
                    .alternative("Omit the config file to run with built-in defaults.")
            }
            Self::ParseFailed(_) => Remediation::new("Fix the TOML syntax in the config file.")
                .alternative("Compare against the documented [window] / [classification] tables."),
            Self::Invalid(_) => Remediation::new(
                "Correct the reported value; durations must be non-zero and the lookback at most one week.",
            ),
        }
    }
}

/// Pathology matcher errors
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid regex: {0}")]
    InvalidRegex(String),
}

impl PatternError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::InvalidRule(_) => {
                Remediation::new("Pathology matcher invalid. Give every matcher a name and at least one condition.")
            }
            Self::InvalidRegex(_) => Remediation::new(
                "Regex pattern invalid. Fix the regex in the [[pathology.*]] matcher.",
            )
            .alternative("Validate the regex syntax."),
        }
    }
}

/// Cluster lookup errors
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("lookup timed out after {0} ms")]
    Timeout(u64),

    #[error("lookup failed: {0}")]
    Failed(String),
}

impl LookupError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::NodeNotFound(_) => {
                Remediation::new("The node may have been removed; the event is still recorded without roles.")
            }
            Self::Timeout(ms) => Remediation::new(format!(
                "Cluster API did not answer within {ms} ms. Raise node_lookup_timeout_ms if the API is slow."
            )),
            Self::Failed(_) => Remediation::new("Check cluster API connectivity and credentials.")
                .alternative("Topology falls back to unset; pathology matching still runs."),
        }
    }
}
