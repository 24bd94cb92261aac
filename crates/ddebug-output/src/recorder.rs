//! Bounded in-memory event history

use ddebug_core::{DiagnosticEvent, EventKind, Result};
use ddebug_ports::EventListener;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_RECORDER_CAPACITY: usize = 10_000;

/// Listener keeping the most recent events; the oldest is dropped when full.
#[derive(Debug)]
pub struct EventRecorder {
    capacity: usize,
    buffer: Mutex<VecDeque<DiagnosticEvent>>,
}

impl EventRecorder {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DiagnosticEvent>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, event: DiagnosticEvent) {
        let mut buffer = self.lock();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }

    /// Snapshot of every recorded event, oldest first
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn events_of(&self, kind: EventKind) -> Vec<DiagnosticEvent> {
        self.lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_RECORDER_CAPACITY)
    }
}

impl EventListener for EventRecorder {
    fn on_event(&self, event: &DiagnosticEvent) -> Result<()> {
        self.record(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}
