//! In-memory output for captures and tests

use ddebug_core::Result;
use ddebug_ports::OutputStream;
use std::sync::{Arc, Mutex, MutexGuard};

/// Read side of a [`MemoryStream`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    text: Arc<Mutex<String>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    /// Written text split into lines
    pub fn lines(&self) -> Vec<String> {
        self.lock().lines().map(str::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Stream appending to a shared string.
pub struct MemoryStream {
    buffer: MemoryBuffer,
    terminal: bool,
}

impl MemoryStream {
    /// Create a stream and the buffer that reads it
    pub fn new() -> (Self, MemoryBuffer) {
        let buffer = MemoryBuffer::new();
        (
            Self {
                buffer: buffer.clone(),
                terminal: false,
            },
            buffer,
        )
    }

    /// Report this stream as a terminal so styled output is produced
    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }
}

impl OutputStream for MemoryStream {
    fn write_str(&mut self, text: &str) -> Result<()> {
        self.buffer.lock().push_str(text);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_stream_collects_text() {
        let (mut stream, buffer) = MemoryStream::new();
        stream.write_str("one\n").unwrap();
        stream.write_str("two\n").unwrap();
        assert_eq!(buffer.contents(), "one\ntwo\n");
        assert_eq!(buffer.lines(), vec!["one", "two"]);
        assert_eq!(buffer.len(), 8);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
