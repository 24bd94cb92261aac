//! Failure entity - an unhandled panic or a top-level error with its context

use super::location::SourceLocation;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::OnceLock;

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureOrigin {
    /// Captured by the panic hook
    Panic,
    /// Reported explicitly from an `Err` that reached the top of the program
    Error,
    /// Interactive stop requested by the program itself
    Breakpoint,
}

/// One frame of a captured backtrace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Frame index (0 = innermost)
    pub index: u32,
    /// Demangled function name
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

/// Symbol prefixes that belong to the runtime, the panic machinery or this crate.
const INTERNAL_FRAME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "backtrace::",
    "rust_begin_unwind",
    "rust_panic",
    "__rust",
    "ddebug::",
    "<ddebug::",
    "ddebug_",
    "test::",
    "_start",
    "__libc",
    "start_thread",
    "clone",
];

impl StackFrame {
    /// True for runtime, panic machinery and ddebug frames.
    pub fn is_internal(&self) -> bool {
        INTERNAL_FRAME_PREFIXES
            .iter()
            .any(|prefix| self.name.starts_with(prefix))
    }
}

/// Everything the failure pipeline knows about one failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub origin: FailureOrigin,
    /// `panic` or the error's type description
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    /// Text of a captured `std::backtrace::Backtrace`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
    /// `source()` chain, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    /// Microseconds since epoch
    pub timestamp: i64,
}

impl FailureInfo {
    pub fn panic(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            origin: FailureOrigin::Panic,
            kind: "panic".to_string(),
            message: message.into(),
            location,
            thread: None,
            backtrace: None,
            causes: Vec::new(),
            timestamp: Utc::now().timestamp_micros(),
        }
    }

    /// A breakpoint at `location`; not a failure, but inspected the same way.
    pub fn breakpoint(location: SourceLocation) -> Self {
        Self {
            origin: FailureOrigin::Breakpoint,
            kind: "breakpoint".to_string(),
            message: "breakpoint reached".to_string(),
            location: Some(location),
            thread: None,
            backtrace: None,
            causes: Vec::new(),
            timestamp: Utc::now().timestamp_micros(),
        }
    }

    /// Build from an error and its `source()` chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            origin: FailureOrigin::Error,
            kind: "error".to_string(),
            message: error.to_string(),
            location: None,
            thread: None,
            backtrace: None,
            causes,
            timestamp: Utc::now().timestamp_micros(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.backtrace = Some(backtrace.into());
        self
    }

    /// First line of a std-like panic report.
    pub fn headline(&self) -> String {
        let thread = self.thread.as_deref().unwrap_or("<unnamed>");
        match (&self.origin, &self.location) {
            (FailureOrigin::Panic, Some(loc)) => format!(
                "thread '{}' panicked at {}:{}:{}:",
                thread, loc.file, loc.line, loc.column
            ),
            (FailureOrigin::Panic, None) => format!("thread '{}' panicked:", thread),
            (FailureOrigin::Error, _) => format!("Error ({}):", self.kind),
            (FailureOrigin::Breakpoint, Some(loc)) => {
                format!("thread '{}' stopped at {}:{}:", thread, loc.file, loc.line)
            }
            (FailureOrigin::Breakpoint, None) => format!("thread '{}' stopped:", thread),
        }
    }

    /// All frames of the captured backtrace.
    pub fn frames(&self) -> Vec<StackFrame> {
        self.backtrace
            .as_deref()
            .map(parse_backtrace)
            .unwrap_or_default()
    }

    /// Frames that belong to the program being debugged.
    pub fn user_frames(&self) -> Vec<StackFrame> {
        self.frames()
            .into_iter()
            .filter(|frame| !frame.is_internal())
            .collect()
    }
}

/// Extract the message of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

fn frame_regex() -> &'static Regex {
    static FRAME: OnceLock<Regex> = OnceLock::new();
    FRAME.get_or_init(|| Regex::new(r"^\s*(\d+):\s+(.+?)\s*$").expect("Static regex is valid"))
}

fn at_regex() -> &'static Regex {
    static AT: OnceLock<Regex> = OnceLock::new();
    AT.get_or_init(|| {
        Regex::new(r"^\s*at\s+(.+?):(\d+)(?::(\d+))?\s*$").expect("Static regex is valid")
    })
}

/// Parse the `Display` text of `std::backtrace::Backtrace`.
///
/// ```text
///    3: app::compute
///              at ./src/main.rs:4:5
/// ```
pub fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = at_regex().captures(line) {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    frame.file = Some(caps[1].to_string());
                    frame.line = caps[2].parse().ok();
                    frame.column = caps.get(3).and_then(|c| c.as_str().parse().ok());
                }
            }
        } else if let Some(caps) = frame_regex().captures(line) {
            frames.push(StackFrame {
                index: caps[1].parse().unwrap_or(0),
                name: caps[2].to_string(),
                file: None,
                line: None,
                column: None,
            });
        }
    }
    frames
}
