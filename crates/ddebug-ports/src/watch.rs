//! Mutation Watch Port
//!
//! Defines the interface of the mutation-watch service. The service keeps one
//! registration per watched variable and turns observed values into
//! normalized change records.
//!
//! # Event Flow
//!
//! ```text
//! Watched<T> mutated through its accessor
//!     |
//! WatchService::observe(id, new repr)
//!     |
//! Some(WatchChange { previous, current })   (None when unchanged)
//!     |
//! Router emits a Watch event
//! ```

use ddebug_core::{Error, Result, SourceLocation};

/// Handle of one watch registration
pub type WatchId = u64;

/// A detected mutation, normalized by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchChange {
    pub id: WatchId,
    pub alias: String,
    /// Repr before the mutation
    pub previous: String,
    /// Repr after the mutation
    pub current: String,
    /// Where the mutating write happened
    pub location: SourceLocation,
}

/// Service that tracks watched variables.
pub trait WatchService: Send + Sync {
    /// Register a variable under `alias` with its current repr.
    fn register(&self, alias: &str, initial: String) -> Result<WatchId>;

    /// Report the repr seen after a write.
    ///
    /// Returns the change when it differs from the last observed repr and
    /// records it as the new last observed value.
    fn observe(
        &self,
        id: WatchId,
        current: String,
        location: SourceLocation,
    ) -> Result<Option<WatchChange>>;

    /// Remove a registration. Unknown ids are `Error::NotWatched`.
    fn unregister(&self, id: WatchId) -> Result<()>;

    /// Check if a registration is live
    fn is_watching(&self, id: WatchId) -> bool;

    /// Number of live registrations
    fn watch_count(&self) -> usize;

    /// Get the name of this service (for logging/identification)
    fn name(&self) -> &str;
}

/// Stand-in used when no watch service is installed.
///
/// Every registration fails with `Error::CapabilityMissing("mutation-watch")`.
pub struct UnavailableWatchService;

/// Capability name reported by [`UnavailableWatchService`]
pub const MUTATION_WATCH_CAPABILITY: &str = "mutation-watch";

impl WatchService for UnavailableWatchService {
    fn register(&self, _alias: &str, _initial: String) -> Result<WatchId> {
        Err(Error::capability_missing(MUTATION_WATCH_CAPABILITY))
    }

    fn observe(
        &self,
        _id: WatchId,
        _current: String,
        _location: SourceLocation,
    ) -> Result<Option<WatchChange>> {
        Err(Error::capability_missing(MUTATION_WATCH_CAPABILITY))
    }

    fn unregister(&self, _id: WatchId) -> Result<()> {
        Err(Error::capability_missing(MUTATION_WATCH_CAPABILITY))
    }

    fn is_watching(&self, _id: WatchId) -> bool {
        false
    }

    fn watch_count(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddebug_core::ErrorCode;

    #[test]
    fn test_unavailable_service_names_capability() {
        let service = UnavailableWatchService;
        let err = service.register("a", "1".to_string()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CapabilityMissing);
        assert!(err.to_string().contains(MUTATION_WATCH_CAPABILITY));
        assert!(!service.is_watching(1));
        assert_eq!(service.watch_count(), 0);
    }
}
