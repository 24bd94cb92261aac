//! Internal logging for ddebug
//!
//! ddebug reports its own events (hook installation, artifact writes,
//! failing sinks, reused output folders) through `tracing`. Inspection lines
//! and traces never go through here; they go through sinks.
//!
//! Nothing is installed unless the program asks for it. The default filter
//! only covers the ddebug crates, so enabling it does not turn on logging
//! for the rest of the program.
//!
//! ```rust,ignore
//! use ddebug_logging::{init, LogConfig};
//!
//! init(LogConfig::new().default_level("debug"));
//!
//! // or into a file; hold the guard until exit
//! let _guard = ddebug_logging::init_with_file(LogConfig::new(), Path::new("ddebug-internal.log"))?;
//! ```

use std::io::IsTerminal;
use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::fmt::time::{LocalTime, UtcTime};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use tracing::{debug, error, info, span, trace, warn, Level};

pub use tracing;

pub use tracing_appender::non_blocking::WorkerGuard;

/// Targets covered by the default filter.
const DDEBUG_TARGETS: &[&str] = &[
    "ddebug",
    "ddebug_config",
    "ddebug_core",
    "ddebug_logging",
    "ddebug_output",
];

const FALLBACK_LOG_FILE: &str = "ddebug-internal.log";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogOutput {
    /// stdout belongs to the program, so stderr is the default
    #[default]
    Stderr,
    Stdout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Force `debug` for every ddebug target, ignoring `RUST_LOG`
    pub debug: bool,
    /// Level for the ddebug targets when `RUST_LOG` is unset
    pub default_level: String,
    pub output: LogOutput,
    pub show_target: bool,
    pub timestamp_format: TimestampFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            default_level: ddebug_config::constants::DEFAULT_LOG_LEVEL.to_string(),
            output: LogOutput::Stderr,
            show_target: true,
            timestamp_format: TimestampFormat::default(),
        }
    }
}

impl From<&ddebug_config::LoggingConfig> for LogConfig {
    fn from(config: &ddebug_config::LoggingConfig) -> Self {
        Self::new().default_level(config.level.clone())
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn utc(self) -> Self {
        self.timestamp_format(TimestampFormat::Utc)
    }

    pub fn local(self) -> Self {
        self.timestamp_format(TimestampFormat::Local)
    }

    /// Preset for command-line programs: quiet unless `debug`.
    pub fn cli(debug: bool) -> Self {
        Self::new().debug(debug).show_target(debug)
    }

    /// Preset for tests: everything from `debug` up.
    pub fn test() -> Self {
        Self::new().default_level("debug")
    }

    /// `ddebug=<level>,ddebug_core=<level>,...`
    fn directives(level: &str) -> String {
        DDEBUG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn build_filter(&self) -> EnvFilter {
        if self.debug {
            return EnvFilter::new(Self::directives("debug"));
        }
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Self::directives(&self.default_level)))
    }

    fn fmt_layer<S>(&self, writer: BoxMakeWriter, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_target(self.show_target)
            .with_writer(writer)
            .with_ansi(ansi);
        match self.timestamp_format {
            TimestampFormat::Utc => layer.with_timer(UtcTime::rfc_3339()).boxed(),
            TimestampFormat::Local => layer.with_timer(LocalTime::rfc_3339()).boxed(),
        }
    }

    fn try_install(&self, writer: BoxMakeWriter, ansi: bool) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.fmt_layer(writer, ansi))
            .with(self.build_filter())
            .try_init()
    }
}

/// Install a global subscriber for ddebug's own events.
///
/// Returns `false` when the program already installed one; it is kept.
/// `RUST_LOG` replaces the default filter when set.
pub fn init(config: LogConfig) -> bool {
    let (writer, ansi) = match config.output {
        LogOutput::Stderr => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
        LogOutput::Stdout => (
            BoxMakeWriter::new(std::io::stdout),
            std::io::stdout().is_terminal(),
        ),
    };
    config.try_install(writer, ansi).is_ok()
}

/// Install a global subscriber writing to `log_path` through a
/// non-blocking writer. Hold the returned guard until exit or the tail of
/// the log is lost.
///
/// # Errors
///
/// Fails when the parent directory cannot be created or a subscriber is
/// already installed.
pub fn init_with_file(config: LogConfig, log_path: &Path) -> std::io::Result<WorkerGuard> {
    ddebug_config::paths::ensure_parent_dir(log_path)?;

    let dir = log_path.parent().unwrap_or(Path::new("."));
    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(FALLBACK_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    config
        .try_install(BoxMakeWriter::new(writer), false)
        .map_err(|e| std::io::Error::other(format!("Failed to set subscriber: {}", e)))?;
    Ok(guard)
}

/// Capture log output in the test harness. Safe to call repeatedly.
pub fn init_test() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogConfig::directives("debug")));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_log_warnings_to_stderr() {
        let config = LogConfig::new();
        assert!(!config.debug);
        assert_eq!(config.default_level, "warn");
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.timestamp_format, TimestampFormat::Local);
    }

    #[test]
    fn test_directives_cover_only_ddebug_targets() {
        let directives = LogConfig::directives("info");
        assert!(directives.starts_with("ddebug=info,"));
        assert!(directives.contains("ddebug_output=info"));
        assert_eq!(directives.split(',').count(), DDEBUG_TARGETS.len());
    }

    #[test]
    fn test_from_logging_section() {
        let section = ddebug_config::LoggingConfig {
            level: "trace".to_string(),
        };
        assert_eq!(LogConfig::from(&section).default_level, "trace");
    }

    #[test]
    fn test_cli_preset() {
        let quiet = LogConfig::cli(false);
        assert!(!quiet.debug && !quiet.show_target);
        let loud = LogConfig::cli(true).utc();
        assert!(loud.debug && loud.show_target);
        assert_eq!(loud.timestamp_format, TimestampFormat::Utc);
    }

    #[test]
    fn test_debug_flag_overrides_level() {
        let filter = format!("{}", LogConfig::new().default_level("error").debug(true).build_filter());
        assert!(filter.contains("ddebug=debug"), "unexpected filter: {}", filter);
    }

    #[test]
    fn test_second_install_reports_false() {
        init_test();
        init_test();
        assert!(!init(LogConfig::test()));
    }
}
