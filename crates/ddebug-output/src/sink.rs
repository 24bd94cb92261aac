//! Sink - shared handle to an output stream
//!
//! A sink is what every diagnostic component writes to. Clones share the
//! same stream, so assigning one sink to several categories makes them
//! write to the same place. Sinks compare by identity ([`Sink::same_as`]).
//!
//! # Scoped acquisition
//!
//! ```rust,ignore
//! use std::io::Write;
//!
//! let (sink, buffer) = Sink::memory();
//! {
//!     let mut out = sink.acquire()?;
//!     writeln!(out, "first")?;
//!     writeln!(out, "second")?;
//! } // released here; no other writer interleaves between the two lines
//! ```

use crate::file_log::FileLog;
use crate::memory::{MemoryBuffer, MemoryStream};
use crate::std_stream::StdStream;
use crate::tee::TeeStream;
use ddebug_core::{Error, Result};
use ddebug_ports::{NullStream, OutputStream};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

struct SinkInner {
    name: String,
    closed: AtomicBool,
    stream: Mutex<Box<dyn OutputStream>>,
}

/// Cheaply clonable handle to one output stream.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<SinkInner>,
}

impl Sink {
    pub fn new<S: OutputStream + 'static>(stream: S) -> Self {
        Self::from_boxed(Box::new(stream))
    }

    pub fn from_boxed(stream: Box<dyn OutputStream>) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                name: stream.name().to_string(),
                closed: AtomicBool::new(false),
                stream: Mutex::new(stream),
            }),
        }
    }

    /// Process standard error
    pub fn stderr() -> Self {
        Self::new(StdStream::stderr())
    }

    /// Process standard output
    pub fn stdout() -> Self {
        Self::new(StdStream::stdout())
    }

    /// Sink that discards everything
    pub fn null() -> Self {
        Self::new(NullStream)
    }

    /// In-memory sink and the buffer to read it
    pub fn memory() -> (Self, MemoryBuffer) {
        let (stream, buffer) = MemoryStream::new();
        (Self::new(stream), buffer)
    }

    /// Durable log only
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(FileLog::create(path)?))
    }

    /// `live` plus a new durable log at `path`
    pub fn tee(live: &Sink, path: impl AsRef<Path>) -> Result<Self> {
        let log = Self::file(path)?;
        Ok(Self::tee_with(live, &log))
    }

    /// `live` plus an existing durable sink, possibly shared with other tees
    pub fn tee_with(live: &Sink, log: &Sink) -> Self {
        Self::new(TeeStream::new(live.clone(), log.clone()))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// True when both handles share one stream
    pub fn same_as(&self, other: &Sink) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn OutputStream>> {
        match self.inner.stream.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(sink = %self.inner.name, "Sink lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::SinkClosed(self.inner.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Acquire the stream for several writes in a row.
    pub fn acquire(&self) -> Result<SinkGuard<'_>> {
        self.ensure_open()?;
        Ok(SinkGuard {
            stream: self.lock(),
        })
    }

    pub fn write_str(&self, text: &str) -> Result<()> {
        self.ensure_open()?;
        self.lock().write_str(text)
    }

    /// Write `line` followed by a newline as one write
    pub fn write_line(&self, line: &str) -> Result<()> {
        self.ensure_open()?;
        let mut text = String::with_capacity(line.len() + 1);
        text.push_str(line);
        text.push('\n');
        self.lock().write_str(&text)
    }

    pub fn flush(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.lock().flush()
    }

    /// Flush and release the stream. Later closes are no-ops.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.lock().close()
    }

    /// True when the stream renders terminal styling
    pub fn is_terminal(&self) -> bool {
        self.lock().is_terminal()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.inner.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Exclusive access to a sink's stream until dropped.
pub struct SinkGuard<'a> {
    stream: MutexGuard<'a, Box<dyn OutputStream>>,
}

impl SinkGuard<'_> {
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.stream.write_str(line)?;
        self.stream.write_str("\n")
    }
}

impl std::io::Write for SinkGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream
            .write_str(&String::from_utf8_lossy(buf))
            .map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush().map_err(std::io::Error::other)
    }
}

impl fmt::Write for SinkGuard<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.stream.write_str(s).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_line_appends_newline() {
        let (sink, buffer) = Sink::memory();
        sink.write_line("hello").unwrap();
        assert_eq!(buffer.contents(), "hello\n");
    }

    #[test]
    fn test_clones_share_stream() {
        let (sink, buffer) = Sink::memory();
        let other = sink.clone();
        other.write_line("via clone").unwrap();
        assert!(sink.same_as(&other));
        assert_eq!(buffer.lines(), vec!["via clone"]);

        let (unrelated, _) = Sink::memory();
        assert!(!sink.same_as(&unrelated));
    }

    #[test]
    fn test_closed_sink_rejects_writes() {
        let (sink, _buffer) = Sink::memory();
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(sink.is_closed());
        assert!(matches!(sink.write_line("x"), Err(Error::SinkClosed(_))));
        assert!(sink.flush().is_ok());
    }

    #[test]
    fn test_acquire_io_write() {
        use std::io::Write;
        let (sink, buffer) = Sink::memory();
        {
            let mut out = sink.acquire().unwrap();
            writeln!(out, "a = {}", 1).unwrap();
            out.write_line("b = 2").unwrap();
        }
        assert_eq!(buffer.lines(), vec!["a = 1", "b = 2"]);
    }

    #[test]
    fn test_acquire_fmt_write() {
        use std::fmt::Write;
        let (sink, buffer) = Sink::memory();
        let mut out = sink.acquire().unwrap();
        write!(out, "{}-{}", "x", 2).unwrap();
        drop(out);
        assert_eq!(buffer.contents(), "x-2");
    }

    #[test]
    fn test_memory_sink_is_not_terminal() {
        let (sink, _) = Sink::memory();
        assert!(!sink.is_terminal());
        assert_eq!(sink.name(), "memory");
    }
}
