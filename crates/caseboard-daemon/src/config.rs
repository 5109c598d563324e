//! Configuration for the caseboard daemon

use caseboard_jobs::JobsConfig;
use caseboard_review::{ConsensusConfig, SynthesisConfig};
use caseboard_validators::ValidatorPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseboardConfig {
    /// Board weights and fallback score
    #[serde(default)]
    pub consensus: ConsensusConfig,

    /// Protocol synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Validator policy
    #[serde(default)]
    pub validators: ValidatorPolicy,

    /// Job manager settings
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Audit sink
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where audit events are appended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// Kept in process memory
    Memory,
    /// Appended to an NDJSON file
    File,
}

/// Audit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Sink kind (default: file)
    #[serde(default = "default_sink")]
    pub sink: AuditSinkKind,

    /// File sink path (default: var/logs/audit.ndjson)
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            path: default_audit_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_sink() -> AuditSinkKind {
    AuditSinkKind::File
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("var/logs/audit.ndjson")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CaseboardConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `CASEBOARD_`-prefixed environment variables (`__` between sections).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CaseboardConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CASEBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// In-memory audit sink, for tests and one-off runs
    pub fn ephemeral() -> Self {
        Self {
            audit: AuditConfig {
                sink: AuditSinkKind::Memory,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
