//! Failure Pipeline
//!
//! Renders an unhandled failure with several independent renderers,
//! persists the renderings and offers an interactive post-mortem session.
//!
//! ```text
//! Idle --failure--> Rendering --all renderers ran--> AwaitingDecision
//!                                                      |            |
//!                                             timeout/decline     accept
//!                                                      |            |
//!                                                     Idle   InteractiveSession --> Idle
//! ```
//!
//! - `pipeline` - rendering, artifacts, post-mortem decision
//! - `renderers` - built-in renderers (styled, explanation, frames, plain)
//! - `explain` - plain-language explanation table
//! - `prompt` - bounded wait-for-keypress
//! - `console` - line-oriented post-mortem session
//! - `hook` - panic hook installation (immediate or at exit)

pub mod console;
pub mod explain;
pub mod hook;
pub mod pipeline;
pub mod prompt;
pub mod renderers;

pub use console::ConsoleSession;
pub use explain::explain;
pub use hook::{capture, HookMode, FAILURE_REPLAY_HOOK};
pub use pipeline::{
    FailurePipeline, FailureReport, PipelineState, PostMortemDecision, RenderOutcome, Rendering,
};
pub use prompt::{read_line_with_timeout, LineFeed, TerminalKeypress};
pub use renderers::{
    default_renderers, renderer_by_name, renderers_by_names, ExplanationRenderer, FramesRenderer,
    PlainRenderer, StyledRenderer,
};

use std::any::Any;
use std::fmt;
use std::path::PathBuf;

/// Panic payload raised when the user quits a debugger session.
///
/// The failure hook never renders or persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerExit;

impl fmt::Display for DebuggerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("debugger session quit")
    }
}

impl std::error::Error for DebuggerExit {}

pub fn is_debugger_exit(payload: &(dyn Any + Send)) -> bool {
    payload.is::<DebuggerExit>()
}

/// Options of an installed failure hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureHook {
    /// Folder receiving `error-<renderer>.txt` and `error.txt`
    pub artifact_dir: Option<PathBuf>,
    /// Also run the hook that was installed before this one
    pub call_previous: bool,
}

impl FailureHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub fn call_previous(mut self, call_previous: bool) -> Self {
        self.call_previous = call_previous;
        self
    }
}
