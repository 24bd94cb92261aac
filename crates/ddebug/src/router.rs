//! Diagnostic Router
//!
//! Owns the enabled flags and the sink assignment shared by the inspector,
//! the tracer, the mutation watcher and the failure pipeline. Every
//! component hands its events to [`Router::emit`]; the router writes the
//! rendered text to the category sink and fans the event out to listeners.
//!
//! State is last-write-wins. Locks exist so the router can live in a
//! `static`; they do not order writes from different threads.

use crate::exit::ExitHooks;
use ddebug_core::{Category, DiagnosticEvent, Result};
use ddebug_logging::{debug, info, warn};
use ddebug_output::Sink;
use ddebug_ports::EventListenerRef;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const CATEGORY_COUNT: usize = Category::ALL.len();

/// Exit-hook name for closing folder/temp-file logs.
pub const LOG_CLEANUP_HOOK: &str = "close-diagnostic-logs";

/// Sink assignment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterPhase {
    /// Every category writes to its process stream
    Default,
    /// At least one category was given a custom sink
    Reassigned,
}

/// Default live sink of a category.
fn default_sink(category: Category) -> Sink {
    match category {
        Category::Rendering => Sink::stdout(),
        _ => Sink::stderr(),
    }
}

pub struct Router {
    enabled: [AtomicBool; CATEGORY_COUNT],
    sinks: RwLock<[Sink; CATEGORY_COUNT]>,
    phase: RwLock<RouterPhase>,
    listeners: RwLock<Vec<EventListenerRef>>,
    exit: Arc<ExitHooks>,
    cleanup_seq: AtomicUsize,
}

impl Router {
    pub fn new(exit: Arc<ExitHooks>) -> Self {
        Self {
            enabled: std::array::from_fn(|_| AtomicBool::new(true)),
            sinks: RwLock::new(Category::ALL.map(default_sink)),
            phase: RwLock::new(RouterPhase::Default),
            listeners: RwLock::new(Vec::new()),
            exit,
            cleanup_seq: AtomicUsize::new(0),
        }
    }

    fn read_sinks(&self) -> RwLockReadGuard<'_, [Sink; CATEGORY_COUNT]> {
        self.sinks.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_sinks(&self) -> RwLockWriteGuard<'_, [Sink; CATEGORY_COUNT]> {
        self.sinks.write().unwrap_or_else(|p| p.into_inner())
    }

    fn mark_reassigned(&self) {
        *self.phase.write().unwrap_or_else(|p| p.into_inner()) = RouterPhase::Reassigned;
    }

    // ========================================================================
    // Enabled flags
    // ========================================================================

    /// True when any category is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled.iter().any(|flag| flag.load(Ordering::Relaxed))
    }

    /// Master switch: set every category.
    pub fn set_enabled(&self, enabled: bool) {
        for flag in &self.enabled {
            flag.store(enabled, Ordering::Relaxed);
        }
        debug!(enabled, "Diagnostics switched");
    }

    pub fn is_category_enabled(&self, category: Category) -> bool {
        self.enabled[category.index()].load(Ordering::Relaxed)
    }

    pub fn set_category_enabled(&self, category: Category, enabled: bool) {
        self.enabled[category.index()].store(enabled, Ordering::Relaxed);
    }

    // ========================================================================
    // Sinks
    // ========================================================================

    /// The inspection sink.
    pub fn sink(&self) -> Sink {
        self.category_sink(Category::Inspection)
    }

    /// Assign `sink` to every category.
    pub fn set_sink(&self, sink: Sink) {
        let mut sinks = self.write_sinks();
        for slot in sinks.iter_mut() {
            *slot = sink.clone();
        }
        drop(sinks);
        self.mark_reassigned();
    }

    pub fn category_sink(&self, category: Category) -> Sink {
        self.read_sinks()[category.index()].clone()
    }

    pub fn set_category_sink(&self, category: Category, sink: Sink) {
        self.write_sinks()[category.index()] = sink;
        self.mark_reassigned();
    }

    pub fn phase(&self) -> RouterPhase {
        *self.phase.read().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_listener(&self, listener: EventListenerRef) {
        debug!(listener = listener.name(), "Added event listener");
        self.listeners
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Route `event` to its category.
    pub fn emit(&self, event: &DiagnosticEvent) {
        self.emit_to(event.category(), event);
    }

    /// Write the event text to `category`'s sink, then notify listeners.
    ///
    /// Does nothing while `category` is disabled. Sink and listener
    /// failures are logged and never reach the caller.
    pub fn emit_to(&self, category: Category, event: &DiagnosticEvent) {
        if !self.is_category_enabled(category) {
            return;
        }
        self.deliver(&self.category_sink(category), event);
    }

    /// Like [`Router::emit`], but write to `sink` instead of the category sink.
    ///
    /// Used for watches with their own destination. The category's enabled
    /// flag still applies.
    pub fn emit_with_sink(&self, sink: &Sink, event: &DiagnosticEvent) {
        if !self.is_category_enabled(event.category()) {
            return;
        }
        self.deliver(sink, event);
    }

    fn deliver(&self, sink: &Sink, event: &DiagnosticEvent) {
        if let Err(e) = sink.write_line(&event.text) {
            warn!("Failed to write {} event to sink '{}': {}", event.kind, sink.name(), e);
        }

        let listeners = self.listeners.read().unwrap_or_else(|p| p.into_inner());
        for listener in listeners.iter() {
            if let Err(e) = listener.on_event(event) {
                warn!("Listener '{}' failed on {} event: {}", listener.name(), event.kind, e);
            }
        }
    }

    /// Write a plain line to `category`'s sink (no event, no listeners).
    pub fn write_line(&self, category: Category, line: &str) {
        if !self.is_category_enabled(category) {
            return;
        }
        let sink = self.category_sink(category);
        if let Err(e) = sink.write_line(line) {
            warn!("Failed to write to sink '{}': {}", sink.name(), e);
        }
    }

    // ========================================================================
    // Reconfiguration
    // ========================================================================

    /// Tee every category into `<folder>/<category>-log.txt`.
    ///
    /// An existing folder is reused after a single warning on the live
    /// inspection stream.
    pub fn use_output_folder(&self, folder: &Path) -> Result<()> {
        if folder.exists() {
            let message = format!(
                "WARNING: the output folder \"{}\" already exists",
                folder.display()
            );
            warn!(folder = %folder.display(), "Output folder already exists, reusing it");
            self.write_line(Category::Inspection, &message);
        } else {
            std::fs::create_dir_all(folder)?;
        }

        let mut logs = Vec::with_capacity(CATEGORY_COUNT);
        {
            let mut sinks = self.write_sinks();
            for category in Category::ALL {
                let slot = &mut sinks[category.index()];
                let log = Sink::file(folder.join(category.log_file_name()))?;
                *slot = Sink::tee_with(slot, &log);
                logs.push(log);
            }
        }
        self.mark_reassigned();
        // live streams stay open after exit
        self.register_cleanup(logs);
        info!(folder = %folder.display(), "Diagnostics tee'd into output folder");
        Ok(())
    }

    /// Send every category to one durable file in the temp directory.
    ///
    /// With `with_live` the previous live streams keep receiving output.
    pub fn use_temporary_file(&self, path: &Path, with_live: bool) -> Result<PathBuf> {
        let log = Sink::file(path)?;
        {
            let mut sinks = self.write_sinks();
            for slot in sinks.iter_mut() {
                let next = if with_live {
                    Sink::tee_with(slot, &log)
                } else {
                    log.clone()
                };
                *slot = next;
            }
        }
        self.mark_reassigned();
        self.register_cleanup(vec![log]);
        info!(path = %path.display(), with_live, "Diagnostics written to temporary file");
        Ok(path.to_path_buf())
    }

    fn register_cleanup(&self, sinks: Vec<Sink>) {
        let seq = self.cleanup_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}:{}", LOG_CLEANUP_HOOK, seq);
        self.exit.register(name, move || {
            for sink in sinks {
                if let Err(e) = sink.close() {
                    warn!("Failed to close '{}': {}", sink.name(), e);
                }
            }
        });
    }

    /// Flush every category sink.
    pub fn flush(&self) {
        for sink in self.read_sinks().iter() {
            if let Err(e) = sink.flush() {
                warn!("Failed to flush '{}': {}", sink.name(), e);
            }
        }
    }
}
