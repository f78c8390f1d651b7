mod observability;
mod session;

pub use observability::*;
pub use session::*;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Parse a config from TOML text.  Missing sections use defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load the config at `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Session policy problems are only ever warnings: the engine behaves
    /// deterministically with any durations, just with surprising rotation
    /// frequency.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let session = &self.session;

        if session.max_lifetime_secs < session.background_inactivity_timeout_secs {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "session.max_lifetime_secs".into(),
                message: format!(
                    "max lifetime ({}s) is shorter than the background inactivity timeout ({}s); \
                     the inactivity timeout will never be reached",
                    session.max_lifetime_secs, session.background_inactivity_timeout_secs,
                ),
            });
        }

        if session.max_lifetime_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "session.max_lifetime_secs".into(),
                message: "zero max lifetime rotates the session whenever any time has passed".into(),
            });
        }

        if session.background_inactivity_timeout_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "session.background_inactivity_timeout_secs".into(),
                message: "zero timeout rotates the session on the first access after backgrounding"
                    .into(),
            });
        }

        let obs = &self.observability;
        if obs.service_name.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.service_name".into(),
                message: "service_name must not be empty".into(),
            });
        }

        if !(0.0..=1.0).contains(&obs.sample_rate) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.sample_rate".into(),
                message: format!("sample_rate must be within [0.0, 1.0], got {}", obs.sample_rate),
            });
        }

        errors
    }
}
