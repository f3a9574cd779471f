//! Load handle implementation
//!
//! A [`LoadHandle`] stands for one asynchronous load, in flight or finished.
//! It is released at most once, no matter how many clones exist or who asks.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use super::backend::RawHandle;
use super::registry::Scope;

/// Global counter for generating unique handle IDs
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique handle ID
fn next_id() -> HandleId {
    HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Unique identifier of a load handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Get the raw id value
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a release request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    /// The load finished; the caller must release this backend handle now
    Now(RawHandle),
    /// The load is still running; it releases itself when it finishes
    Deferred,
    /// Somebody already released it
    AlreadyReleased,
}

/// Mutable part of a handle, guarded as a unit so release and completion
/// can never both hand out the backend handle.
#[derive(Debug, Default)]
struct Lifecycle {
    raw: Option<RawHandle>,
    released: bool,
}

#[derive(Debug)]
struct HandleState {
    id: HandleId,
    /// What was requested, for log lines
    request: String,
    lifecycle: Mutex<Lifecycle>,
    scope: OnceLock<Scope>,
}

/// Shared handle to one asynchronous load.
///
/// Cloning is cheap; all clones refer to the same load.
#[derive(Debug, Clone)]
pub struct LoadHandle {
    inner: Arc<HandleState>,
}

impl LoadHandle {
    pub(crate) fn new(request: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleState {
                id: next_id(),
                request: request.into(),
                lifecycle: Mutex::new(Lifecycle::default()),
                scope: OnceLock::new(),
            }),
        }
    }

    /// Get the unique ID of this handle
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    /// Description of the request that created this handle
    #[must_use]
    pub fn request(&self) -> &str {
        &self.inner.request
    }

    /// Whether the backend has answered the load
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lifecycle().raw.is_some()
    }

    /// Whether the handle has been released
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.lifecycle().released
    }

    /// Backend handle, once the load has finished
    #[must_use]
    pub fn raw(&self) -> Option<RawHandle> {
        self.lifecycle().raw
    }

    /// Scope this handle is tracked under, if any
    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.inner.scope.get()
    }

    /// Attach the handle to a scope. Returns false if it already has one.
    pub(crate) fn assign_scope(&self, scope: Scope) -> bool {
        self.inner.scope.set(scope).is_ok()
    }

    /// Record the backend handle of a finished load.
    ///
    /// Returns true if the handle was released while the load was running,
    /// in which case the caller must release `raw` itself.
    pub(crate) fn complete(&self, raw: RawHandle) -> bool {
        let mut lifecycle = self.lifecycle();
        lifecycle.raw = Some(raw);
        lifecycle.released
    }

    /// Mark the handle released.
    pub(crate) fn release(&self) -> Release {
        let mut lifecycle = self.lifecycle();
        if lifecycle.released {
            return Release::AlreadyReleased;
        }
        lifecycle.released = true;
        match lifecycle.raw {
            Some(raw) => Release::Now(raw),
            None => Release::Deferred,
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for LoadHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for LoadHandle {}

impl Hash for LoadHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_ids_are_unique() {
        let first = LoadHandle::new("a");
        let second = LoadHandle::new("b");
        assert_ne!(first.id(), second.id());
        assert_eq!(first, first.clone());
    }

    #[test]
    fn test_release_after_completion() {
        let handle = LoadHandle::new("goblin");
        assert!(!handle.complete(RawHandle(3)));
        assert!(handle.is_complete());

        assert_eq!(handle.release(), Release::Now(RawHandle(3)));
        assert_eq!(handle.release(), Release::AlreadyReleased);
        assert!(handle.is_released());
    }

    #[test]
    fn test_release_before_completion_defers() {
        let handle = LoadHandle::new("orc");
        assert_eq!(handle.release(), Release::Deferred);

        // The finishing load is told to release its backend handle
        assert!(handle.complete(RawHandle(9)));
        assert_eq!(handle.clone().release(), Release::AlreadyReleased);
    }

    #[test]
    fn test_scope_assigned_once() {
        let handle = LoadHandle::new("troll");
        assert!(handle.assign_scope(Scope::new("level_1")));
        assert!(!handle.assign_scope(Scope::new("level_2")));
        assert_eq!(handle.scope(), Some(&Scope::new("level_1")));
    }
}
