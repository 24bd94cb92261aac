//! ddebug Core - Domain entities shared by every ddebug crate
//!
//! This crate has no I/O and no global state.
//!
//! # Architecture
//!
//! - `entities` - Diagnostic events, source locations, failures
//! - `error` - Domain error types
//! - `formatting` - Duration and text helpers
//!
//! # Related Crates
//!
//! - Config types: `ddebug-config`
//! - Port traits (OutputStream, WatchService, FailureRenderer, ...): `ddebug-ports`

pub mod entities;
pub mod error;
pub mod formatting;

pub use entities::{
    panic_message, parse_backtrace, Category, DiagnosticEvent, EventKind, EventPayload,
    FailureInfo, FailureOrigin, InspectedValue, SourceLocation, StackFrame,
};
pub use error::{Error, ErrorCategory, ErrorCode, Result};
pub use formatting::{format_duration, format_elapsed, strip_ansi, truncate_repr};
