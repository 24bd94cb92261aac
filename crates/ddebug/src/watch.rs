//! Mutation Watcher
//!
//! Rust cannot observe arbitrary writes to a variable, so watched values
//! live in a [`Watched<T>`] and every write goes through its accessors
//! (`set`, `modify`, `borrow_mut`). After each write the new `Debug` repr is
//! handed to the [`WatchService`], which reports a change when it differs
//! from the last observed repr. Changes become Watch events:
//!
//! ```text
//! Watch trigger ::: File "src/main.rs", line 14, in app::run
//!     a:was 1 is now 2
//! ```
//!
//! While the watch category is disabled no repr is computed and nothing is
//! observed; the next reported change is relative to the last reported value.

use crate::instrument::tracer::active_scope;
use crate::router::Router;
use ddebug_core::{Category, DiagnosticEvent, Error, Result, SourceLocation};
use ddebug_logging::{debug, warn};
use ddebug_output::Sink;
use ddebug_ports::{WatchChange, WatchId, WatchService, WatchServiceRef};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// WatchRegistry - default WatchService
// ============================================================================

struct Registration {
    alias: String,
    last: String,
}

/// In-process watch service keyed by [`WatchId`].
pub struct WatchRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<WatchId, Registration>>,
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed repr of a live registration.
    pub fn last_value(&self, id: WatchId) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.get(&id).map(|entry| entry.last.clone())
    }
}

impl WatchService for WatchRegistry {
    fn register(&self, alias: &str, initial: String) -> Result<WatchId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(
            id,
            Registration {
                alias: alias.to_string(),
                last: initial,
            },
        );
        debug!(id, alias, "Registered watch");
        Ok(id)
    }

    fn observe(
        &self,
        id: WatchId,
        current: String,
        location: SourceLocation,
    ) -> Result<Option<WatchChange>> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let entry = entries.get_mut(&id).ok_or(Error::NotWatched(id))?;
        if entry.last == current {
            return Ok(None);
        }
        let previous = std::mem::replace(&mut entry.last, current.clone());
        Ok(Some(WatchChange {
            id,
            alias: entry.alias.clone(),
            previous,
            current,
            location,
        }))
    }

    fn unregister(&self, id: WatchId) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.remove(&id).ok_or(Error::NotWatched(id))?;
        debug!(id, "Unregistered watch");
        Ok(())
    }

    fn is_watching(&self, id: WatchId) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.contains_key(&id)
    }

    fn watch_count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn name(&self) -> &str {
        "registry"
    }
}

// ============================================================================
// Watched<T>
// ============================================================================

/// Text of one Watch event.
pub fn format_change(change: &WatchChange) -> String {
    format!(
        "Watch trigger ::: File \"{}\", line {}, in {}\n\t{}:was {} is now {}",
        change.location.file,
        change.location.line,
        change.location.scope_name(),
        change.alias,
        change.previous,
        change.current
    )
}

/// Registration owned by one `Watched<T>`; unregisters on drop.
struct WatchHandle {
    id: WatchId,
    alias: String,
    router: Arc<Router>,
    service: WatchServiceRef,
    sink: Option<Sink>,
    released: bool,
}

impl WatchHandle {
    fn observe(&self, site: SourceLocation, current: &dyn Debug) {
        if !self.router.is_category_enabled(Category::Watch) {
            return;
        }
        let site = match active_scope() {
            Some(scope) => site.with_scope(scope),
            None => site,
        };
        let repr = format!("{:?}", current);
        match self.service.observe(self.id, repr, site) {
            Ok(Some(change)) => {
                let text = format_change(&change);
                let event = DiagnosticEvent::mutation(
                    change.location,
                    change.alias,
                    change.previous,
                    change.current,
                    text,
                );
                match &self.sink {
                    Some(sink) => self.router.emit_with_sink(sink, &event),
                    None => self.router.emit_to(Category::Watch, &event),
                }
            }
            Ok(None) => {}
            Err(e) => warn!(alias = %self.alias, "Failed to observe watched value: {}", e),
        }
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.service.unregister(self.id)
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            debug!(alias = %self.alias, "Watch already released: {}", e);
        }
    }
}

/// A value whose writes are reported as Watch events.
///
/// Reads are free; every write goes through an accessor that reports a
/// change when the `Debug` repr differs from the last reported one.
///
/// ```rust,ignore
/// let mut a = ddebug::dd().watch(1, "a")?;
/// a.set(2);                 // a:was 1 is now 2
/// a.modify(|v| *v += 1);    // a:was 2 is now 3
/// *a.borrow_mut() = 10;     // a:was 3 is now 10
/// let a = a.unwatch()?;
/// ```
pub struct Watched<T> {
    value: T,
    handle: WatchHandle,
}

impl<T: Debug> Watched<T> {
    pub(crate) fn new(
        value: T,
        alias: &str,
        router: Arc<Router>,
        service: WatchServiceRef,
        sink: Option<Sink>,
    ) -> Result<Self> {
        let id = service.register(alias, format!("{:?}", value))?;
        Ok(Self {
            value,
            handle: WatchHandle {
                id,
                alias: alias.to_string(),
                router,
                service,
                sink,
                released: false,
            },
        })
    }

    pub fn id(&self) -> WatchId {
        self.handle.id
    }

    pub fn alias(&self) -> &str {
        &self.handle.alias
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value, returning the previous one.
    #[track_caller]
    pub fn set(&mut self, value: T) -> T {
        let site = SourceLocation::caller();
        let previous = std::mem::replace(&mut self.value, value);
        self.handle.observe(site, &self.value);
        previous
    }

    /// Mutate the value in place.
    #[track_caller]
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let site = SourceLocation::caller();
        let result = f(&mut self.value);
        self.handle.observe(site, &self.value);
        result
    }

    /// Mutable access; the write is reported when the guard drops.
    #[track_caller]
    pub fn borrow_mut(&mut self) -> WatchGuard<'_, T> {
        WatchGuard {
            site: Some(SourceLocation::caller()),
            watched: self,
        }
    }

    /// Stop watching and take the value back.
    pub fn unwatch(self) -> Result<T> {
        let Watched { value, mut handle } = self;
        handle.release()?;
        Ok(value)
    }
}

impl<T> Deref for Watched<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Debug> Debug for Watched<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watched")
            .field("alias", &self.handle.alias)
            .field("value", &self.value)
            .finish()
    }
}

/// Mutable borrow of a watched value.
pub struct WatchGuard<'a, T: Debug> {
    watched: &'a mut Watched<T>,
    site: Option<SourceLocation>,
}

impl<T: Debug> Deref for WatchGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.watched.value
    }
}

impl<T: Debug> DerefMut for WatchGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.watched.value
    }
}

impl<T: Debug> Drop for WatchGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(site) = self.site.take() {
            self.watched.handle.observe(site, &self.watched.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::ExitHooks;
    use ddebug_core::{ErrorCode, EventKind, EventPayload};
    use ddebug_output::{EventRecorder, MemoryBuffer};
    use ddebug_ports::UnavailableWatchService;

    struct Setup {
        router: Arc<Router>,
        registry: Arc<WatchRegistry>,
        buffer: MemoryBuffer,
        recorder: Arc<EventRecorder>,
    }

    fn setup() -> Setup {
        let router = Arc::new(Router::new(Arc::new(ExitHooks::new())));
        let (sink, buffer) = Sink::memory();
        router.set_sink(sink);
        let recorder = Arc::new(EventRecorder::default());
        router.add_listener(recorder.clone());
        Setup {
            router,
            registry: Arc::new(WatchRegistry::new()),
            buffer,
            recorder,
        }
    }

    fn watch<T: Debug>(s: &Setup, value: T, alias: &str) -> Watched<T> {
        Watched::new(value, alias, Arc::clone(&s.router), s.registry.clone(), None).unwrap()
    }

    fn pairs(recorder: &EventRecorder) -> Vec<(String, String)> {
        recorder
            .events_of(EventKind::Watch)
            .into_iter()
            .map(|event| match event.payload {
                EventPayload::Mutation {
                    previous, current, ..
                } => (previous, current),
                other => panic!("unexpected payload {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_three_mutations_three_events() {
        let s = setup();
        let mut a = watch(&s, 1, "a");

        a.set(2);
        a.modify(|v| *v += 1);
        *a.borrow_mut() = 10;

        assert_eq!(
            pairs(&s.recorder),
            vec![
                ("1".to_string(), "2".to_string()),
                ("2".to_string(), "3".to_string()),
                ("3".to_string(), "10".to_string()),
            ]
        );
        let out = s.buffer.contents();
        assert!(out.contains("Watch trigger ::: File \""));
        assert!(out.contains("\ta:was 1 is now 2\n"));
    }

    #[test]
    fn test_event_points_at_write() {
        let s = setup();
        let mut v = watch(&s, vec![1], "v");
        let line = line!() + 1;
        v.modify(|v| v.push(2));

        let event = &s.recorder.events()[0];
        assert_eq!(event.location.line, line);
        assert!(event.location.file.ends_with("watch.rs"));
        assert!(event.text.contains(&format!("line {}, in <module>", line)));
    }

    #[test]
    fn test_unchanged_write_is_silent() {
        let s = setup();
        let mut a = watch(&s, "same", "a");
        a.set("same");
        let _ = a.borrow_mut();
        assert!(s.recorder.is_empty());
    }

    #[test]
    fn test_unwatch_returns_value_and_unregisters() {
        let s = setup();
        let mut a = watch(&s, 5, "a");
        let id = a.id();
        a.set(6);
        assert!(s.registry.is_watching(id));

        assert_eq!(a.unwatch().unwrap(), 6);
        assert!(!s.registry.is_watching(id));
        assert_eq!(s.registry.watch_count(), 0);
    }

    #[test]
    fn test_drop_unregisters() {
        let s = setup();
        {
            let _a = watch(&s, 1, "a");
            assert_eq!(s.registry.watch_count(), 1);
        }
        assert_eq!(s.registry.watch_count(), 0);
    }

    #[test]
    fn test_own_sink() {
        let s = setup();
        let (own, own_out) = Sink::memory();
        let mut b = Watched::new(
            String::from("x"),
            "b",
            Arc::clone(&s.router),
            s.registry.clone(),
            Some(own),
        )
        .unwrap();
        b.modify(|v| v.push('y'));

        assert!(s.buffer.is_empty());
        assert!(own_out.contents().contains("b:was \"x\" is now \"xy\""));
        assert_eq!(s.recorder.count(EventKind::Watch), 1);
    }

    #[test]
    fn test_disabled_is_silent() {
        let s = setup();
        let mut a = watch(&s, 1, "a");
        s.router.set_enabled(false);
        a.set(2);
        assert!(s.buffer.is_empty());
        assert!(s.recorder.is_empty());
        assert_eq!(s.registry.last_value(a.id()).as_deref(), Some("1"));
    }

    #[test]
    fn test_registry_rejects_unknown_id() {
        let registry = WatchRegistry::new();
        let err = registry
            .observe(99, "1".into(), SourceLocation::new("a.rs", 1))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotWatched);
        assert_eq!(registry.unregister(99).unwrap_err().code(), ErrorCode::NotWatched);
    }

    #[test]
    fn test_missing_service_is_capability_error() {
        let s = setup();
        let result = Watched::new(1, "a", s.router, Arc::new(UnavailableWatchService), None);
        let err = result.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CapabilityMissing);
        assert!(err.to_string().contains("mutation-watch"));
    }
}
