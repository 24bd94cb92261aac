//! Durable log file
//!
//! The file copy never receives terminal styling: every write is passed
//! through `strip_ansi` first. Each write is flushed so the log is complete
//! even when the process dies inside a panic hook.

use crate::error::ToOutputResult;
use ddebug_core::{strip_ansi, Error, Result};
use ddebug_ports::OutputStream;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileLog {
    path: PathBuf,
    name: String,
    writer: Option<BufWriter<File>>,
}

impl FileLog {
    /// Create (or truncate) the file at `path`, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ddebug_config::paths::ensure_parent_dir(&path)
            .output_context("Failed to create log directory")?;
        let file = File::create(&path)
            .output_context(&format!("Failed to create log file {}", path.display()))?;
        debug!(path = %path.display(), "Opened durable log");
        Ok(Self {
            name: format!("file:{}", path.display()),
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

impl OutputStream for FileLog {
    fn write_str(&mut self, text: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::SinkClosed(self.name.clone()))?;
        writer
            .write_all(strip_ansi(text).as_bytes())
            .output_context("Failed to write log file")?;
        writer.flush().output_context("Failed to flush log file")
    }

    fn flush(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush().output_context("Failed to flush log file"),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().output_context("Failed to flush log file")?;
            debug!(path = %self.path.display(), "Closed durable log");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FileLog {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
