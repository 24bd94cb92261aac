//! Event Listener Port
//!
//! Alternate consumers of diagnostic events (recorders, JSON exporters,
//! custom renderers). The router fans every emitted event out to all
//! registered listeners after writing it to the category sink.

use ddebug_core::{DiagnosticEvent, Result};
use std::sync::Arc;

/// Port trait for diagnostic event consumers.
///
/// A listener error is logged by the router and never reaches the
/// program or the other listeners.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &DiagnosticEvent) -> Result<()>;

    /// Get the name of this listener (for logging/identification)
    fn name(&self) -> &str;
}

/// Listener that ignores every event
pub struct NullListener;

impl EventListener for NullListener {
    fn on_event(&self, _event: &DiagnosticEvent) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

impl<T: EventListener + ?Sized> EventListener for Arc<T> {
    fn on_event(&self, event: &DiagnosticEvent) -> Result<()> {
        (**self).on_event(event)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
