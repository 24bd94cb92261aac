//! Default constants for ddebug configuration
//!
//! Single source of truth for default values, environment variable names
//! and file names. Everything that is configurable should be here.

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

/// Force the post-mortem offer on (`1`, `true`, `enabled`, `always`) or off
/// (`0`, `false`, `disabled`, `never`). Unset means prompt.
pub const ENV_DDEBUG_POST_MORTEM: &str = "DDEBUG_POST_MORTEM";

/// Config file path override
pub const ENV_DDEBUG_CONFIG: &str = "DDEBUG_CONFIG";

/// Start the default instance disabled with `0`/`false`
pub const ENV_DDEBUG_ENABLED: &str = "DDEBUG_ENABLED";

/// Inspection prefix override
pub const ENV_DDEBUG_PREFIX: &str = "DDEBUG_PREFIX";

/// Trace depth override
pub const ENV_DDEBUG_TRACE_DEPTH: &str = "DDEBUG_TRACE_DEPTH";

/// Temporary directory candidates, checked in order
pub const ENV_TMPDIR: &str = "TMPDIR";
pub const ENV_TEMP: &str = "TEMP";

// ============================================================================
// INSPECTION
// ============================================================================

/// Prefix of every inspection line
pub const DEFAULT_PREFIX: &str = "dd| ";

/// Include `file:line in scope` in inspection lines
pub const DEFAULT_INCLUDE_CONTEXT: bool = true;

/// Maximum characters of a single repr (0 = unlimited)
pub const DEFAULT_MAX_REPR_LEN: usize = 0;

// ============================================================================
// TRACING
// ============================================================================

/// Traced call depth. 1 means no descent into calls made by the traced function.
pub const DEFAULT_TRACE_DEPTH: usize = 1;

/// Maximum characters of argument and return reprs in trace lines
pub const DEFAULT_TRACE_REPR_LEN: usize = 200;

// ============================================================================
// FAILURE PIPELINE
// ============================================================================

/// Wait-for-keypress window before the post-mortem session (milliseconds)
pub const DEFAULT_PROMPT_TIMEOUT_MS: u64 = 5_000;

/// Upper bound accepted for the prompt window (milliseconds)
pub const MAX_PROMPT_TIMEOUT_MS: u64 = 60_000;

/// Answers that decline the post-mortem offer
pub const DECLINE_ANSWERS: &[&str] = &["n", "no", "not"];

pub const RENDERER_STYLED: &str = "styled";
pub const RENDERER_EXPLANATION: &str = "explanation";
pub const RENDERER_FRAMES: &str = "frames";
pub const RENDERER_PLAIN: &str = "plain";

/// Renderers in priority order
pub const DEFAULT_RENDERERS: &[&str] = &[
    RENDERER_STYLED,
    RENDERER_EXPLANATION,
    RENDERER_FRAMES,
    RENDERER_PLAIN,
];

/// Per-renderer artifact name; `{}` is replaced by the renderer name
pub const DEFAULT_ARTIFACT_PATTERN: &str = "error-{}.txt";

/// Artifact collecting every renderer output
pub const COMBINED_ARTIFACT_NAME: &str = "error.txt";

// ============================================================================
// FILES AND FOLDERS
// ============================================================================

/// Default config filename
pub const DEFAULT_CONFIG_FILENAME: &str = "ddebug.toml";

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "ddebug";

/// Single-file log in the temporary directory
pub const TEMP_LOG_FILENAME: &str = "ddebug.txt";

/// Suffix of the default output folder
pub const OUTPUT_FOLDER_SUFFIX: &str = "log";

/// chrono format of the dated output folder suffix
pub const OUTPUT_FOLDER_DATE_FORMAT: &str = "%m-%d-%Y,%H-%M-%S";

/// Program stem used when the executable name cannot be determined
pub const FALLBACK_PROGRAM_NAME: &str = "interactive";

// ============================================================================
// LOGGING
// ============================================================================

/// Internal log level when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "warn";
