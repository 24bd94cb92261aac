//! Filesystem source provider
//!
//! `file!()` paths are relative to the workspace that compiled the crate,
//! while the process may run from a member directory. Relative paths are
//! tried against every configured root and every ancestor of the working
//! directory. Files are read once and cached; unreadable files are cached
//! as missing.

use ddebug_logging::trace;
use ddebug_ports::SourceProvider;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Lines = Option<Arc<Vec<String>>>;

#[derive(Default)]
pub struct FsSourceProvider {
    roots: Vec<PathBuf>,
    cache: Mutex<HashMap<String, Lines>>,
}

impl FsSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also resolve relative paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    fn candidates(&self, file: &str) -> Vec<PathBuf> {
        let path = Path::new(file);
        if path.is_absolute() {
            return vec![path.to_path_buf()];
        }
        let mut candidates: Vec<PathBuf> = self.roots.iter().map(|root| root.join(path)).collect();
        if let Ok(cwd) = std::env::current_dir() {
            candidates.extend(cwd.ancestors().map(|dir| dir.join(path)));
        }
        candidates
    }

    fn load(&self, file: &str) -> Lines {
        let text = self
            .candidates(file)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .and_then(|found| std::fs::read_to_string(found).ok());
        if text.is_none() {
            trace!(file, "Source file not found");
        }
        text.map(|text| Arc::new(text.lines().map(str::to_string).collect()))
    }

    fn lines_of(&self, file: &str) -> Lines {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(cached) = cache.get(file) {
            return cached.clone();
        }
        let loaded = self.load(file);
        cache.insert(file.to_string(), loaded.clone());
        loaded
    }
}

impl SourceProvider for FsSourceProvider {
    fn line(&self, file: &str, line: u32) -> Option<String> {
        let index = line.checked_sub(1)? as usize;
        self.lines_of(file)?.get(index).cloned()
    }

    fn lines(&self, file: &str, start: u32, end: u32) -> Vec<(u32, String)> {
        let Some(lines) = self.lines_of(file) else {
            return Vec::new();
        };
        (start.max(1)..=end)
            .filter_map(|n| lines.get(n as usize - 1).map(|text| (n, text.clone())))
            .collect()
    }
}
