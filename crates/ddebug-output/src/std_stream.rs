//! Standard stream output (stderr / stdout)

use crate::error::ToOutputResult;
use ddebug_core::Result;
use ddebug_ports::OutputStream;
use std::io::{IsTerminal, Write};

/// Which process stream to write to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdTarget {
    Stdout,
    Stderr,
}

/// Process standard stream.
///
/// Each write locks the process stream, so lines from concurrent writers
/// never interleave mid-line.
pub struct StdStream {
    target: StdTarget,
}

impl StdStream {
    pub fn stderr() -> Self {
        Self {
            target: StdTarget::Stderr,
        }
    }

    pub fn stdout() -> Self {
        Self {
            target: StdTarget::Stdout,
        }
    }

    pub fn target(&self) -> StdTarget {
        self.target
    }
}

impl OutputStream for StdStream {
    fn write_str(&mut self, text: &str) -> Result<()> {
        match self.target {
            StdTarget::Stdout => std::io::stdout()
                .lock()
                .write_all(text.as_bytes())
                .output_context("Failed to write to stdout"),
            StdTarget::Stderr => std::io::stderr()
                .lock()
                .write_all(text.as_bytes())
                .output_context("Failed to write to stderr"),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.target {
            StdTarget::Stdout => std::io::stdout()
                .flush()
                .output_context("Failed to flush stdout"),
            StdTarget::Stderr => std::io::stderr()
                .flush()
                .output_context("Failed to flush stderr"),
        }
    }

    fn is_terminal(&self) -> bool {
        match self.target {
            StdTarget::Stdout => std::io::stdout().is_terminal(),
            StdTarget::Stderr => std::io::stderr().is_terminal(),
        }
    }

    fn name(&self) -> &str {
        match self.target {
            StdTarget::Stdout => "stdout",
            StdTarget::Stderr => "stderr",
        }
    }
}
