//! Output Stream Port
//!
//! A writable destination behind a sink: a standard stream, a durable log
//! file, a memory buffer, or a tee of several.

use ddebug_core::Result;

/// Port trait for writable destinations.
///
/// Implementations are used behind a lock by exactly one sink at a time,
/// so methods take `&mut self`.
pub trait OutputStream: Send {
    /// Write text as-is (no newline is added)
    fn write_str(&mut self, text: &str) -> Result<()>;

    /// Flush any buffered text
    fn flush(&mut self) -> Result<()>;

    /// Flush and release the destination.
    ///
    /// Must be idempotent: closing twice is a no-op.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    /// True when the destination renders terminal styling
    fn is_terminal(&self) -> bool {
        false
    }

    /// Get the name of this stream (for logging/identification)
    fn name(&self) -> &str;
}

/// Stream that discards everything
pub struct NullStream;

impl OutputStream for NullStream {
    fn write_str(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

impl<T: OutputStream + ?Sized> OutputStream for Box<T> {
    fn write_str(&mut self, text: &str) -> Result<()> {
        (**self).write_str(text)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_terminal(&self) -> bool {
        (**self).is_terminal()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
