//! Orchestrator configuration.
//!
//! Built once and immutable for the orchestrator's lifetime. Values come
//! from defaults, environment variables or the builder methods.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sources::{Depth, SourceKind};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an unparsable value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Which sources are enabled for this deployment.
///
/// Carried as configuration for the surrounding tooling; source selection
/// for a run is decided purely by its depth (see
/// [`crate::sources::sources_for_depth`]), matching observed behavior of
/// the system this replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlags {
    pub web_search: bool,
    pub github: bool,
    pub twitter: bool,
    pub arxiv: bool,
}

impl Default for SourceFlags {
    fn default() -> Self {
        Self {
            web_search: true,
            github: true,
            twitter: false,
            arxiv: false,
        }
    }
}

impl SourceFlags {
    /// Returns whether a source is enabled.
    pub fn is_enabled(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::WebSearch => self.web_search,
            SourceKind::Github => self.github,
            SourceKind::Twitter => self.twitter,
            SourceKind::Arxiv => self.arxiv,
        }
    }

    fn enable(&mut self, kind: SourceKind) {
        match kind {
            SourceKind::WebSearch => self.web_search = true,
            SourceKind::Github => self.github = true,
            SourceKind::Twitter => self.twitter = true,
            SourceKind::Arxiv => self.arxiv = true,
        }
    }
}

/// Configuration for the research orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchConfig {
    /// Default depth for new tasks.
    pub depth: Depth,
    /// Concurrency hint for the execute fan-out. The engine currently
    /// dispatches all selected sources of a run at once; this value does
    /// not impose a hard cap.
    pub parallel: usize,
    /// Timeout applied to each external collaborator call.
    pub timeout: Duration,
    /// Attempts per source fetch before its failure is recorded.
    pub retry: u32,
    /// Enabled-source flags.
    pub sources: SourceFlags,
    /// Directory reports are written to.
    pub reports_dir: PathBuf,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            depth: Depth::Medium,
            parallel: 4,
            timeout: Duration::from_secs(10 * 60),
            retry: 3,
            sources: SourceFlags::default(),
            reports_dir: PathBuf::from("./reports"),
        }
    }
}

impl ResearchConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RESEARCH_DEPTH`: default depth, parsed leniently (default: medium)
    /// - `RESEARCH_PARALLEL`: fan-out concurrency hint (default: 4)
    /// - `RESEARCH_TIMEOUT_SECS`: per-call timeout in seconds (default: 600)
    /// - `RESEARCH_RETRY`: attempts per source fetch (default: 3)
    /// - `RESEARCH_SOURCES`: comma-separated enabled sources
    ///   (default: web_search,github)
    /// - `RESEARCH_WORKSPACE`: workspace root; reports go to
    ///   `<root>/memory/research`
    /// - `RESEARCH_REPORTS_DIR`: explicit reports directory, overrides the
    ///   workspace-derived path (default: ./reports)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unparsable numeric values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RESEARCH_DEPTH") {
            config.depth = Depth::parse_lenient(&val);
        }

        if let Ok(val) = std::env::var("RESEARCH_PARALLEL") {
            config.parallel = parse_env_value(&val, "RESEARCH_PARALLEL")?;
        }

        if let Ok(val) = std::env::var("RESEARCH_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "RESEARCH_TIMEOUT_SECS")?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("RESEARCH_RETRY") {
            config.retry = parse_env_value(&val, "RESEARCH_RETRY")?;
        }

        if let Ok(val) = std::env::var("RESEARCH_SOURCES") {
            let mut flags = SourceFlags {
                web_search: false,
                github: false,
                twitter: false,
                arxiv: false,
            };
            for name in val.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let kind = SourceKind::parse(name).ok_or_else(|| ConfigError::InvalidValue {
                    key: "RESEARCH_SOURCES".to_string(),
                    message: format!("unknown source '{name}'"),
                })?;
                flags.enable(kind);
            }
            config.sources = flags;
        }

        if let Ok(val) = std::env::var("RESEARCH_WORKSPACE") {
            config.reports_dir = PathBuf::from(val).join("memory").join("research");
        }

        if let Ok(val) = std::env::var("RESEARCH_REPORTS_DIR") {
            config.reports_dir = PathBuf::from(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel == 0 {
            return Err(ConfigError::ValidationFailed(
                "parallel must be greater than 0".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry == 0 {
            return Err(ConfigError::ValidationFailed(
                "retry must be at least 1".to_string(),
            ));
        }

        if self.reports_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "reports_dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the default depth.
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// Builder method to set the fan-out concurrency hint.
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder method to set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to set the attempts per source fetch.
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Builder method to set the enabled-source flags.
    pub fn with_sources(mut self, sources: SourceFlags) -> Self {
        self.sources = sources;
        self
    }

    /// Builder method to set the reports directory.
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{value}'"),
    })
}
