//! Configuration loading, validation, and management for overseer.
//!
//! Loads configuration from `~/.overseer/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.overseer/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reasoning-acting loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Memory compaction settings
    #[serde(default)]
    pub compaction: CompactionSettings,

    /// Planner/executor supervision settings
    #[serde(default)]
    pub supervisor: SupervisorSettings,
}

/// Settings for a single reasoning-acting agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum model calls per reply
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Messages kept in history before the oldest are dropped
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether replies are printed to the log
    #[serde(default = "default_true")]
    pub console_output: bool,
}

fn default_max_iterations() -> usize {
    10
}
fn default_memory_capacity() -> usize {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            memory_capacity: default_memory_capacity(),
            temperature: default_temperature(),
            max_tokens: None,
            console_output: true,
        }
    }
}

/// Settings for token-triggered history summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Estimated token total at which compaction kicks in
    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: usize,

    /// Most recent messages left untouched
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,

    /// Characters per token for the estimating counter
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,
}

fn default_trigger_threshold() -> usize {
    80_000
}
fn default_keep_recent() -> usize {
    3
}
fn default_chars_per_token() -> f64 {
    4.0
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            trigger_threshold: default_trigger_threshold(),
            keep_recent: default_keep_recent(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

/// Settings for the planner/executor double loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Executor runs allowed before the loop is forced to stop
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,

    /// Log every round at info instead of debug
    #[serde(default)]
    pub verbose_logging: bool,

    /// Jinja template used to ask the planner for a review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_template: Option<String>,

    /// Jinja template used to hand a new instruction to the executor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_template: Option<String>,
}

fn default_max_loop_iterations() -> usize {
    3
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            max_loop_iterations: default_max_loop_iterations(),
            verbose_logging: false,
            review_template: None,
            instruction_template: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.overseer/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `OVERSEER_MAX_ITERATIONS`
    /// - `OVERSEER_MAX_LOOP_ITERATIONS`
    /// - `OVERSEER_COMPACTION_THRESHOLD` (also enables compaction)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".overseer")
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup("OVERSEER_MAX_ITERATIONS") {
            self.agent.max_iterations = parse_env("OVERSEER_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = lookup("OVERSEER_MAX_LOOP_ITERATIONS") {
            self.supervisor.max_loop_iterations =
                parse_env("OVERSEER_MAX_LOOP_ITERATIONS", &value)?;
        }
        if let Some(value) = lookup("OVERSEER_COMPACTION_THRESHOLD") {
            self.compaction.trigger_threshold =
                parse_env("OVERSEER_COMPACTION_THRESHOLD", &value)?;
            self.compaction.enabled = true;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.memory_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "agent.memory_capacity must be at least 1".into(),
            ));
        }

        if self.compaction.enabled && self.compaction.trigger_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "compaction.trigger_threshold must be > 0 when compaction is enabled".into(),
            ));
        }

        // The summary plus the kept tail plus the next input must fit in memory.
        if self.compaction.enabled
            && self.compaction.keep_recent + 2 > self.agent.memory_capacity
        {
            return Err(ConfigError::ValidationError(format!(
                "compaction.keep_recent ({}) must be at most agent.memory_capacity - 2 ({})",
                self.compaction.keep_recent,
                self.agent.memory_capacity.saturating_sub(2)
            )));
        }

        if self.compaction.chars_per_token <= 0.0 {
            return Err(ConfigError::ValidationError(
                "compaction.chars_per_token must be > 0".into(),
            ));
        }

        if self.supervisor.max_loop_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "supervisor.max_loop_iterations must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key} must be a non-negative integer, got '{value}'"))
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
