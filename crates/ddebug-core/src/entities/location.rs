//! Source location value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a diagnostic call in source code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    /// Enclosing function or module path
    #[serde(default)]
    pub scope: String,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: 0,
            scope: String::new(),
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = column;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Location of the caller, as reported by `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(std::panic::Location::caller())
    }

    /// Last path component of `file`.
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file.as_str())
    }

    /// `file:line` with the short file name.
    pub fn short(&self) -> String {
        format!("{}:{}", self.file_name(), self.line)
    }

    /// Display name of the enclosing scope, `<module>` when unknown.
    pub fn scope_name(&self) -> &str {
        if self.scope.is_empty() {
            "<module>"
        } else {
            &self.scope
        }
    }
}

impl From<&std::panic::Location<'_>> for SourceLocation {
    fn from(location: &std::panic::Location<'_>) -> Self {
        SourceLocation::new(location.file(), location.line()).with_column(location.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} in {}", self.file_name(), self.line, self.scope_name())
    }
}
