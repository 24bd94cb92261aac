//! Failure Renderer Port
//!
//! One independent explanation of a failure: a styled traceback, a
//! plain-language explanation, a frame listing. The failure pipeline runs
//! every renderer in priority order, each into its own buffer.

use crate::source::SourceProvider;
use ddebug_core::{FailureInfo, Result};

/// Inputs shared by all renderers of one failure.
pub struct RenderContext<'a> {
    /// Source lines for traceback context
    pub source: &'a dyn SourceProvider,
    /// Emit terminal styling
    pub color: bool,
    /// Lines of source shown around the failing line
    pub context_lines: u32,
}

impl<'a> RenderContext<'a> {
    pub fn new(source: &'a dyn SourceProvider) -> Self {
        Self {
            source,
            color: false,
            context_lines: 2,
        }
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Port trait for failure renderers.
///
/// A renderer writes its complete output into `out`. Returning an error
/// marks this renderer as failed; the pipeline reports it and continues
/// with the next one.
pub trait FailureRenderer: Send + Sync {
    fn render(&self, failure: &FailureInfo, ctx: &RenderContext<'_>, out: &mut String)
        -> Result<()>;

    /// Artifact name of this renderer (`error-<name>.txt`)
    fn name(&self) -> &str;
}
