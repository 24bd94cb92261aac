//! Interaction Ports
//!
//! The bounded wait-for-keypress prompt and the interactive post-mortem
//! session offered after a failure has been rendered.

use ddebug_core::{FailureInfo, Result};
use std::time::Duration;

/// Source of the answer to the post-mortem offer.
pub trait KeypressSource: Send + Sync {
    /// Wait up to `timeout` for one line of input.
    ///
    /// `None` on timeout, end of input or interrupt.
    fn wait_for_line(&self, timeout: Duration) -> Option<String>;

    /// True when a person can answer (stdin is a terminal)
    fn is_interactive(&self) -> bool;
}

/// Keypress source for unattended runs: never interactive
pub struct NoKeypress;

impl KeypressSource for NoKeypress {
    fn wait_for_line(&self, _timeout: Duration) -> Option<String> {
        None
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Leave the session and let the program go on
    Continue,
    /// User asked to quit the debugger
    Quit,
}

/// Interactive session over a captured failure (or a live breakpoint).
pub trait PostMortem: Send + Sync {
    fn run(&self, failure: &FailureInfo) -> Result<SessionOutcome>;

    /// Get the name of this session type (for logging/identification)
    fn name(&self) -> &str;
}

/// Session that returns immediately
pub struct NoPostMortem;

impl PostMortem for NoPostMortem {
    fn run(&self, _failure: &FailureInfo) -> Result<SessionOutcome> {
        Ok(SessionOutcome::Continue)
    }

    fn name(&self) -> &str {
        "none"
    }
}
