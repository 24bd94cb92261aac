//! Diagnostic event entity - one record per inspection, call, mutation or failure

use super::location::SourceLocation;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What produced a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Inspect,
    Call,
    Watch,
    Exception,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Inspect => "inspect",
            EventKind::Call => "call",
            EventKind::Watch => "watch",
            EventKind::Exception => "exception",
        }
    }

    /// Output category the event is routed to.
    pub fn category(&self) -> Category {
        match self {
            EventKind::Inspect => Category::Inspection,
            EventKind::Call => Category::Instrumentation,
            EventKind::Watch => Category::Watch,
            EventKind::Exception => Category::Rendering,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output channel shared by one group of producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Value inspector and call-announce lines
    Inspection,
    /// Step tracing
    Instrumentation,
    /// Mutation watcher
    Watch,
    /// Failure renderers and pretty printing
    Rendering,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Inspection,
        Category::Instrumentation,
        Category::Watch,
        Category::Rendering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Inspection => "inspection",
            Category::Instrumentation => "instrumentation",
            Category::Watch => "watch",
            Category::Rendering => "rendering",
        }
    }

    /// File name of the category log inside an output folder.
    pub fn log_file_name(&self) -> String {
        format!("{}-log.txt", self.as_str())
    }

    pub fn index(&self) -> usize {
        match self {
            Category::Inspection => 0,
            Category::Instrumentation => 1,
            Category::Watch => 2,
            Category::Rendering => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inspected expression and its representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectedValue {
    /// Source text of the expression, when it could be captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    pub repr: String,
}

impl InspectedValue {
    pub fn new(expr: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            expr: Some(expr.into()),
            repr: repr.into(),
        }
    }

    pub fn anonymous(repr: impl Into<String>) -> Self {
        Self {
            expr: None,
            repr: repr.into(),
        }
    }
}

/// Structured content of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Text {
        text: String,
    },
    Values {
        values: Vec<InspectedValue>,
    },
    Call {
        callable: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        owner: Option<String>,
    },
    Mutation {
        alias: String,
        previous: String,
        current: String,
    },
    Failure {
        kind: String,
        message: String,
    },
}

/// Immutable record produced by one component and consumed by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub kind: EventKind,
    pub location: SourceLocation,
    pub payload: EventPayload,
    /// Rendered text, exactly as written to the category sink
    pub text: String,
    /// Microseconds since epoch
    pub timestamp: i64,
}

impl DiagnosticEvent {
    /// Get current timestamp in microseconds
    pub fn now_micros() -> i64 {
        Utc::now().timestamp_micros()
    }

    pub fn new(
        kind: EventKind,
        location: SourceLocation,
        payload: EventPayload,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location,
            payload,
            text: text.into(),
            timestamp: Self::now_micros(),
        }
    }

    pub fn inspect(location: SourceLocation, values: Vec<InspectedValue>, text: String) -> Self {
        Self::new(
            EventKind::Inspect,
            location,
            EventPayload::Values { values },
            text,
        )
    }

    pub fn call(
        location: SourceLocation,
        callable: impl Into<String>,
        owner: Option<String>,
        text: String,
    ) -> Self {
        Self::new(
            EventKind::Call,
            location,
            EventPayload::Call {
                callable: callable.into(),
                owner,
            },
            text,
        )
    }

    pub fn mutation(
        location: SourceLocation,
        alias: impl Into<String>,
        previous: impl Into<String>,
        current: impl Into<String>,
        text: String,
    ) -> Self {
        Self::new(
            EventKind::Watch,
            location,
            EventPayload::Mutation {
                alias: alias.into(),
                previous: previous.into(),
                current: current.into(),
            },
            text,
        )
    }

    pub fn failure(
        location: SourceLocation,
        kind: impl Into<String>,
        message: impl Into<String>,
        text: String,
    ) -> Self {
        Self::new(
            EventKind::Exception,
            location,
            EventPayload::Failure {
                kind: kind.into(),
                message: message.into(),
            },
            text,
        )
    }

    /// Free-form text event (trace lines, pretty prints, stack dumps).
    pub fn text(kind: EventKind, location: SourceLocation, text: String) -> Self {
        Self::new(
            kind,
            location,
            EventPayload::Text { text: text.clone() },
            text,
        )
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
