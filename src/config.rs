//! WolfConsensus Configuration
//!
//! This module provides configuration structures for the consensus core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::election::ElectionConfig;
use crate::session::MAX_ENCODED_PRINCIPAL_LENGTH;

/// Main WolfConsensus configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Node-specific configuration
    #[serde(default)]
    pub node: NodeConfig,

    /// Election configuration
    #[serde(default)]
    pub election: ElectionSettings,

    /// Session admission configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Cluster member id of this node
    #[serde(default)]
    pub member_id: i32,

    /// Endpoints of every cluster member (informational)
    #[serde(default)]
    pub cluster_members: Vec<String>,
}

/// Election configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSettings {
    /// Maximum number of fallbacks to CANVASS before giving up
    #[serde(default = "default_max_canvass_retries")]
    pub max_canvass_retries: u32,

    /// Duty cycle interval in milliseconds
    #[serde(default = "default_duty_cycle_interval_ms")]
    pub duty_cycle_interval_ms: u64,
}

/// Session admission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Largest encoded principal accepted at authentication
    #[serde(default = "default_max_encoded_principal_length")]
    pub max_encoded_principal_length: usize,
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Write election events to the audit trail
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Audit trail file
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Initial encoding buffer size in bytes
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_max_canvass_retries() -> u32 {
    10
}

fn default_duty_cycle_interval_ms() -> u64 {
    1
}

fn default_max_encoded_principal_length() -> usize {
    MAX_ENCODED_PRINCIPAL_LENGTH
}

fn default_true() -> bool {
    true
}

fn default_buffer_capacity() -> usize {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ElectionSettings {
    fn default() -> Self {
        Self {
            max_canvass_retries: default_max_canvass_retries(),
            duty_cycle_interval_ms: default_duty_cycle_interval_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_encoded_principal_length: default_max_encoded_principal_length(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ConsensusConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: ConsensusConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.member_id < 0 {
            return Err(crate::Error::Config("node.member_id cannot be negative".into()));
        }

        if self.election.duty_cycle_interval_ms == 0 {
            return Err(crate::Error::Config(
                "election.duty_cycle_interval_ms must be at least 1".into(),
            ));
        }

        let max = self.session.max_encoded_principal_length;
        if max == 0 || max > MAX_ENCODED_PRINCIPAL_LENGTH {
            return Err(crate::Error::Config(format!(
                "session.max_encoded_principal_length must be 1..={}",
                MAX_ENCODED_PRINCIPAL_LENGTH
            )));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::Error::Config(format!(
                "logging.format must be pretty or json, got {}",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Election state machine settings
    pub fn election_config(&self) -> ElectionConfig {
        ElectionConfig {
            max_canvass_retries: self.election.max_canvass_retries,
        }
    }

    /// Get duty cycle interval as Duration
    pub fn duty_cycle_interval(&self) -> Duration {
        Duration::from_millis(self.election.duty_cycle_interval_ms)
    }

    /// Audit trail path, if auditing is enabled and a path is set
    pub fn audit_path(&self) -> Option<&PathBuf> {
        if self.audit.enabled {
            self.audit.path.as_ref()
        } else {
            None
        }
    }
}
