//! Source Access Port
//!
//! Reads source text for call sites (classifier, degraded inspection) and
//! for traceback context (failure renderers).

/// Read-only access to program source lines.
pub trait SourceProvider: Send + Sync {
    /// Text of one 1-based line, without the trailing newline.
    ///
    /// `None` when the file or line cannot be read.
    fn line(&self, file: &str, line: u32) -> Option<String>;

    /// Lines `start..=end` that exist, with their numbers.
    fn lines(&self, file: &str, start: u32, end: u32) -> Vec<(u32, String)> {
        (start.max(1)..=end)
            .filter_map(|n| self.line(file, n).map(|text| (n, text)))
            .collect()
    }
}

/// Provider for programs whose source is not available
pub struct NoSource;

impl SourceProvider for NoSource {
    fn line(&self, _file: &str, _line: u32) -> Option<String> {
        None
    }
}
