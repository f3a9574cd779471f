//! Scope-bound handle registry
//!
//! Tracks outstanding load handles per lifetime [`Scope`] and releases them
//! in bulk when the scope ends. The registry belongs to one context; all
//! mutation happens inside a single critical section.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::backend::AssetBackend;
use super::error::AssetError;
use super::handle::{LoadHandle, Release};

/// A coarse lifetime boundary, such as a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Create a scope from its name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Scope name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// How a new load is tied to a lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Tracking {
    /// Track under the context's active scope
    #[default]
    Current,
    /// Track under an explicit scope
    Scope(Scope),
    /// Do not track; the caller owns the handle and must release it
    Untracked,
}

/// Outcome of ending a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Handles whose backend data was released now
    pub released: usize,
    /// Handles the backend had already invalidated
    pub stale: usize,
    /// Handles still loading; they release themselves on completion
    pub pending: usize,
    /// Handles their owner had already released explicitly
    pub already_released: usize,
}

impl ReleaseReport {
    /// Total handles evicted from the scope
    #[must_use]
    pub const fn total(&self) -> usize {
        self.released + self.stale + self.pending + self.already_released
    }
}

/// Handles grouped per scope. Most scopes hold only a few loads.
type ScopeBucket = SmallVec<[LoadHandle; 8]>;

/// Registry of tracked load handles.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    scopes: Mutex<FxHashMap<Scope, ScopeBucket>>,
}

impl HandleRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle` under `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AlreadyTracked`] if the handle already belongs to a scope.
    pub fn track(&self, handle: &LoadHandle, scope: Scope) -> Result<(), AssetError> {
        let mut scopes = self.lock();
        if !handle.assign_scope(scope.clone()) {
            return Err(AssetError::AlreadyTracked {
                handle: handle.id(),
            });
        }
        log::trace!("Tracking load {} under scope '{scope}'", handle.id());
        scopes.entry(scope).or_default().push(handle.clone());
        Ok(())
    }

    /// Release every handle tracked under `scope` and forget the scope.
    ///
    /// Handles the backend no longer considers valid are skipped, as are
    /// handles their owner already released. Ending a scope that is empty or
    /// unknown does nothing.
    pub fn release_scope(&self, scope: &Scope, backend: &dyn AssetBackend) -> ReleaseReport {
        let Some(handles) = self.lock().remove(scope) else {
            return ReleaseReport::default();
        };

        let mut report = ReleaseReport::default();
        for handle in handles {
            match handle.release() {
                Release::Now(raw) if backend.is_valid(raw) => {
                    backend.release(raw);
                    report.released += 1;
                }
                Release::Now(raw) => {
                    log::debug!("Skipping stale backend handle {raw:?} for load {}", handle.id());
                    report.stale += 1;
                }
                Release::Deferred => report.pending += 1,
                Release::AlreadyReleased => report.already_released += 1,
            }
        }

        log::debug!(
            "Scope '{scope}' ended: {} released, {} stale, {} pending, {} already released",
            report.released,
            report.stale,
            report.pending,
            report.already_released
        );
        report
    }

    /// Number of handles tracked under `scope`
    #[must_use]
    pub fn tracked_count(&self, scope: &Scope) -> usize {
        self.lock().get(scope).map_or(0, SmallVec::len)
    }

    /// Number of handles tracked across all scopes
    #[must_use]
    pub fn total_tracked(&self) -> usize {
        self.lock().values().map(SmallVec::len).sum()
    }

    /// Scopes that currently hold handles
    #[must_use]
    pub fn scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.lock().keys().cloned().collect();
        scopes.sort();
        scopes
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<Scope, ScopeBucket>> {
        self.scopes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
