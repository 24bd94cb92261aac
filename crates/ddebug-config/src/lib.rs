//! Configuration types and loading for ddebug
//!
//! This crate provides:
//! - Configuration structures for the inspector, tracer, failure pipeline and outputs
//! - Config file loading (TOML format)
//! - Environment variable overrides
//!
//! # Usage
//!
//! ```rust,ignore
//! use ddebug_config::{load_config, Config};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ddebug.toml"))?.with_env_overrides();
//! println!("prefix: {}", config.inspect.prefix);
//! ```
//!
//! # File format
//!
//! ```toml
//! enabled = true
//!
//! [inspect]
//! prefix = "dd| "
//! include_context = true
//!
//! [trace]
//! depth = 1
//!
//! [failure]
//! post_mortem = "prompt"   # prompt | always | never
//! prompt_timeout_ms = 5000
//! renderers = ["styled", "explanation", "frames", "plain"]
//! ```

mod loader;

// Default constants for all configuration values
pub mod constants;

// Path utilities
pub mod paths;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use constants::*;

pub use loader::{load_config, load_config_from_str, load_default_config, resolve_config_path, ConfigError};

// ============================================================================
// Post-mortem policy
// ============================================================================

/// Whether the failure pipeline offers an interactive session after rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostMortemPolicy {
    /// Wait a bounded time for the user to accept (terminal only)
    #[default]
    Prompt,
    /// Enter the session without asking
    Always,
    /// Never enter the session
    Never,
}

impl PostMortemPolicy {
    /// Parse an environment value. Unknown values are `None`.
    pub fn parse_env(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "enabled" | "always" | "on" => Some(PostMortemPolicy::Always),
            "0" | "false" | "disabled" | "never" | "off" => Some(PostMortemPolicy::Never),
            "" | "prompt" | "auto" => Some(PostMortemPolicy::Prompt),
            _ => None,
        }
    }

    /// Policy from `DDEBUG_POST_MORTEM`, `None` when unset or unparsable.
    pub fn from_env() -> Option<Self> {
        env::var(ENV_DDEBUG_POST_MORTEM)
            .ok()
            .and_then(|v| Self::parse_env(&v))
    }
}

// ============================================================================
// Sections
// ============================================================================

/// `[inspect]` - value inspector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Prefix of every inspection line
    pub prefix: String,
    /// Include `file:line in scope` after the prefix
    pub include_context: bool,
    /// Use `{:#?}` instead of `{:?}` for reprs
    pub pretty: bool,
    /// Maximum characters per repr (0 = unlimited)
    pub max_repr_len: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            include_context: DEFAULT_INCLUDE_CONTEXT,
            pretty: false,
            max_repr_len: DEFAULT_MAX_REPR_LEN,
        }
    }
}

/// `[trace]` - step tracing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Traced call depth; 1 = no descent into nested calls
    pub depth: usize,
    /// Append the call duration to return lines
    pub show_elapsed: bool,
    /// Maximum characters of argument and return reprs
    pub max_repr_len: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TRACE_DEPTH,
            show_elapsed: true,
            max_repr_len: DEFAULT_TRACE_REPR_LEN,
        }
    }
}

impl TraceConfig {
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn show_elapsed(mut self, show: bool) -> Self {
        self.show_elapsed = show;
        self
    }
}

/// `[failure]` - failure pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    pub post_mortem: PostMortemPolicy,
    /// Wait-for-keypress window in milliseconds
    pub prompt_timeout_ms: u64,
    /// Renderer names in priority order
    pub renderers: Vec<String>,
    /// Per-renderer artifact file name, `{}` = renderer name
    pub artifact_pattern: String,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            post_mortem: PostMortemPolicy::default(),
            prompt_timeout_ms: DEFAULT_PROMPT_TIMEOUT_MS,
            renderers: DEFAULT_RENDERERS.iter().map(|s| s.to_string()).collect(),
            artifact_pattern: DEFAULT_ARTIFACT_PATTERN.to_string(),
        }
    }
}

impl FailureConfig {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_millis(self.prompt_timeout_ms)
    }

    /// Artifact file name for one renderer.
    pub fn artifact_name(&self, renderer: &str) -> String {
        self.artifact_pattern.replace("{}", renderer)
    }
}

/// `[output]` - output folder defaults used by `use_output_folder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Explicit folder; derived from the program name when unset
    pub folder: Option<PathBuf>,
    /// Suffix the derived folder with the current date instead of `log`
    pub with_date: bool,
    /// Install a failure hook writing `error*.txt` into the folder
    pub with_errors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: None,
            with_date: false,
            with_errors: true,
        }
    }
}

/// `[logging]` - internal diagnostics of ddebug itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Complete ddebug configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch for every diagnostic channel
    pub enabled: bool,
    pub inspect: InspectConfig,
    pub trace: TraceConfig,
    pub failure: FailureConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            inspect: InspectConfig::default(),
            trace: TraceConfig::default(),
            failure: FailureConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Create a new Config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply environment variable overrides.
    ///
    /// Environment variables take precedence over file values and defaults.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(policy) = PostMortemPolicy::from_env() {
            self.failure.post_mortem = policy;
        }

        if let Ok(value) = env::var(ENV_DDEBUG_ENABLED) {
            match value.trim().to_ascii_lowercase().as_str() {
                "0" | "false" | "disabled" | "off" => self.enabled = false,
                "1" | "true" | "enabled" | "on" => self.enabled = true,
                _ => {}
            }
        }

        if let Ok(prefix) = env::var(ENV_DDEBUG_PREFIX) {
            if !prefix.is_empty() {
                self.inspect.prefix = prefix;
            }
        }

        if let Ok(depth) = env::var(ENV_DDEBUG_TRACE_DEPTH) {
            if let Ok(depth) = depth.trim().parse::<usize>() {
                self.trace.depth = depth.max(1);
            }
        }

        self
    }

    /// Check value ranges and renderer names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trace.depth == 0 {
            return Err(ConfigError::ValidationError(
                "trace.depth must be at least 1".to_string(),
            ));
        }
        if self.failure.prompt_timeout_ms == 0
            || self.failure.prompt_timeout_ms > MAX_PROMPT_TIMEOUT_MS
        {
            return Err(ConfigError::ValidationError(format!(
                "failure.prompt_timeout_ms must be between 1 and {}",
                MAX_PROMPT_TIMEOUT_MS
            )));
        }
        if self.failure.renderers.is_empty() {
            return Err(ConfigError::ValidationError(
                "failure.renderers must name at least one renderer".to_string(),
            ));
        }
        if let Some(unknown) = self
            .failure
            .renderers
            .iter()
            .find(|name| !DEFAULT_RENDERERS.contains(&name.as_str()))
        {
            return Err(ConfigError::ValidationError(format!(
                "unknown renderer '{}', expected one of {:?}",
                unknown, DEFAULT_RENDERERS
            )));
        }
        if !self.failure.artifact_pattern.contains("{}") {
            return Err(ConfigError::ValidationError(
                "failure.artifact_pattern must contain '{}'".to_string(),
            ));
        }
        Ok(())
    }
}
