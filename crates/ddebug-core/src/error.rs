//! Error types for the ddebug domain

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Error Codes - Machine-readable codes
// ============================================================================

/// Machine-readable error codes.
///
/// Error code ranges:
/// - 1xxx: Call-site errors
/// - 2xxx: Rendering errors
/// - 3xxx: Sink errors
/// - 4xxx: Config errors
/// - 5xxx: Infrastructure errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
pub enum ErrorCode {
    /// Optional collaborator is not installed (1001)
    CapabilityMissing = 1001,
    /// Source text for a call site cannot be read (1002)
    SourceUnavailable = 1002,
    /// Watch handle is not registered (1003)
    NotWatched = 1003,
    /// Invalid argument passed to a public operation (1004)
    InvalidArgument = 1004,

    /// A failure renderer returned an error (2001)
    RendererFailed = 2001,

    /// Sink has been closed (3001)
    SinkClosed = 3001,
    /// Writing to an output destination failed (3002)
    OutputFailed = 3002,

    /// Invalid configuration (4001)
    ConfigInvalid = 4001,

    /// I/O error (5001)
    IoError = 5001,
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

// ============================================================================
// Error Categories
// ============================================================================

/// How a caller should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Reported as a labeled diagnostic line, never raised to the program
    Degraded,
    /// Returned to the caller; the requested operation did not happen
    Terminal,
    /// Underlying I/O problem
    Internal,
}

impl ErrorCategory {
    /// Get the category name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCategory::Degraded => "degraded",
            ErrorCategory::Terminal => "terminal",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl ErrorCode {
    /// Get the numeric value of the error code
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the category of this error code
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::SourceUnavailable | ErrorCode::RendererFailed => ErrorCategory::Degraded,

            ErrorCode::CapabilityMissing
            | ErrorCode::NotWatched
            | ErrorCode::InvalidArgument
            | ErrorCode::SinkClosed
            | ErrorCode::ConfigInvalid => ErrorCategory::Terminal,

            ErrorCode::OutputFailed | ErrorCode::IoError => ErrorCategory::Internal,
        }
    }

    /// Get the error code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::CapabilityMissing => "CAPABILITY_MISSING",
            ErrorCode::SourceUnavailable => "SOURCE_UNAVAILABLE",
            ErrorCode::NotWatched => "NOT_WATCHED",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::RendererFailed => "RENDERER_FAILED",
            ErrorCode::SinkClosed => "SINK_CLOSED",
            ErrorCode::OutputFailed => "OUTPUT_FAILED",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::IoError => "IO_ERROR",
        }
    }
}

// ============================================================================
// Error
// ============================================================================

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing capability '{capability}': no {capability} service is installed")]
    CapabilityMissing { capability: String },

    #[error("Failed to access the underlying source code for analysis ({file}:{line})")]
    SourceUnavailable { file: String, line: u32 },

    #[error("Watch {0} is not registered")]
    NotWatched(u64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Renderer '{renderer}' failed: {message}")]
    Renderer { renderer: String, message: String },

    #[error("Sink '{0}' is closed")]
    SinkClosed(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a missing optional collaborator.
    pub fn capability_missing(capability: impl Into<String>) -> Self {
        Error::CapabilityMissing {
            capability: capability.into(),
        }
    }

    /// Shorthand for a renderer failure.
    pub fn renderer(renderer: impl Into<String>, message: impl ToString) -> Self {
        Error::Renderer {
            renderer: renderer.into(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::CapabilityMissing { .. } => ErrorCode::CapabilityMissing,
            Error::SourceUnavailable { .. } => ErrorCode::SourceUnavailable,
            Error::NotWatched(_) => ErrorCode::NotWatched,
            Error::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Error::Renderer { .. } => ErrorCode::RendererFailed,
            Error::SinkClosed(_) => ErrorCode::SinkClosed,
            Error::Output(_) => ErrorCode::OutputFailed,
            Error::Config(_) => ErrorCode::ConfigInvalid,
            Error::Io(_) => ErrorCode::IoError,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// True for errors that are printed as a labeled line instead of raised.
    pub fn is_degradable(&self) -> bool {
        self.category() == ErrorCategory::Degraded
    }
}
