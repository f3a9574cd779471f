//! Asset context
//!
//! The public face of the crate. An [`AssetContext`] owns the location index,
//! the handle registry and the loader for one backend. It is created by the
//! caller and shared by `Arc`; there is no process-wide instance.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --initialize()--> Initializing --all scans done--> Ready
//! ```
//!
//! Every load operation checks for `Ready` first and fails immediately with
//! [`AssetError::NotInitialized`] otherwise. Nothing is queued.
//!
//! # Example
//!
//! ```ignore
//! let context = Arc::new(AssetContext::new(backend, AssetConfig::default()));
//! context
//!     .initialize([("enemies", AssetType::of::<Sprite>())])
//!     .await?;
//!
//! let ticket = context.load_one("goblin", Tracking::Current, |sprite: Arc<Sprite>| {
//!     spawn_enemy(sprite);
//! })?;
//! ticket.wait().await;
//!
//! // Scene change
//! context.end_scope(&Scope::new("scene"));
//! ```

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures::future::join_all;
use tokio::task::JoinHandle;

use super::backend::{AssetBackend, BackendError};
use super::error::AssetError;
use super::handle::{LoadHandle, Release};
use super::index::{LocationIndex, Matches};
use super::loader::{AsyncLoader, LoadRequest, LoadTicket};
use super::locator::{AssetType, Locator};
use super::registry::{HandleRegistry, ReleaseReport, Scope, Tracking};
use super::signal::{Listener, Trigger, signal};
use crate::core::{
    AssetConfig, AssetStats, LifecycleQueue, LookupMode, ScanMode, ScopeEvent, StatsSnapshot,
};

/// Initialization state of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// `initialize` has not been called
    Uninitialized,
    /// Label scans are running
    Initializing,
    /// Scans finished; loads are accepted
    Ready,
}

/// What initialization found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Locators added to the index
    pub indexed: usize,
    /// Labels whose scan found nothing
    pub empty_labels: Vec<String>,
    /// Labels whose scan failed, with the backend error
    pub failed_labels: Vec<(String, BackendError)>,
}

/// Label-indexed asset cache with scope-bound handle release.
pub struct AssetContext {
    backend: Arc<dyn AssetBackend>,
    config: AssetConfig,
    state: Mutex<ContextState>,
    index: RwLock<LocationIndex>,
    registry: HandleRegistry,
    loader: AsyncLoader,
    stats: Arc<AssetStats>,
    /// Taken and fired exactly once, when initialization completes
    ready_trigger: Mutex<Option<Trigger<()>>>,
    ready: Listener<()>,
    current_scope: RwLock<Scope>,
}

impl AssetContext {
    /// Create an uninitialized context over `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn AssetBackend>, config: AssetConfig) -> Self {
        let stats = Arc::new(AssetStats::new());
        let (ready_trigger, ready) = signal();
        Self {
            loader: AsyncLoader::new(Arc::clone(&backend), Arc::clone(&stats)),
            index: RwLock::new(LocationIndex::with_policy(config.match_policy)),
            current_scope: RwLock::new(Scope::new(config.default_scope.clone())),
            backend,
            config,
            state: Mutex::new(ContextState::Uninitialized),
            registry: HandleRegistry::new(),
            stats,
            ready_trigger: Mutex::new(Some(ready_trigger)),
            ready,
        }
    }

    // ------------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------------

    /// Scan every label and build the location index.
    ///
    /// Labels whose scan is empty or fails are logged and skipped. The context
    /// becomes ready only after every scan has finished. Dropping the future
    /// before then puts the context back to `Uninitialized`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AlreadyInitialized`] unless the context is uninitialized.
    pub async fn initialize<L>(
        &self,
        labels: impl IntoIterator<Item = (L, AssetType)>,
    ) -> Result<InitReport, AssetError>
    where
        L: Into<String>,
    {
        {
            let mut state = lock(&self.state);
            if *state != ContextState::Uninitialized {
                log::error!("Asset context initialize called twice");
                return Err(AssetError::AlreadyInitialized);
            }
            *state = ContextState::Initializing;
        }
        let mut guard = InitGuard {
            state: &self.state,
            finished: false,
        };

        let labels: Vec<(String, AssetType)> = labels
            .into_iter()
            .map(|(label, asset_type)| (label.into(), asset_type))
            .collect();
        log::info!("Scanning {} asset labels ({:?})", labels.len(), self.config.scan_mode);

        let results = match self.config.scan_mode {
            ScanMode::Concurrent => {
                join_all(
                    labels
                        .iter()
                        .map(|(label, asset_type)| self.backend.scan_label(label, *asset_type)),
                )
                .await
            }
            ScanMode::Sequential => {
                let mut results = Vec::with_capacity(labels.len());
                for (label, asset_type) in &labels {
                    results.push(self.backend.scan_label(label, *asset_type).await);
                }
                results
            }
        };

        let mut report = InitReport::default();
        {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            for ((label, asset_type), result) in labels.into_iter().zip(results) {
                match result {
                    Ok(locators) if locators.is_empty() => {
                        log::warn!("No resource locations found for label '{label}'");
                        report.empty_labels.push(label);
                    }
                    Ok(locators) => {
                        let added = index.append(asset_type, locators);
                        log::debug!("Label '{label}' indexed {added} {asset_type} locations");
                        report.indexed += added;
                    }
                    Err(err) => {
                        log::warn!("Scanning label '{label}' failed: {err}");
                        report.failed_labels.push((label, err));
                    }
                }
            }
        }

        *lock(&self.state) = ContextState::Ready;
        guard.finished = true;
        if let Some(trigger) = lock(&self.ready_trigger).take() {
            trigger.fire(());
        }
        log::info!("Asset context ready: {} locations indexed", report.indexed);

        Ok(report)
    }

    /// Run [`AssetContext::initialize`] in the background.
    ///
    /// Returns immediately; use [`AssetContext::wait_for_init`] or the join
    /// handle to learn when the context is ready.
    pub fn spawn_initialize<L>(
        self: &Arc<Self>,
        labels: impl IntoIterator<Item = (L, AssetType)>,
    ) -> JoinHandle<Result<InitReport, AssetError>>
    where
        L: Into<String>,
    {
        let labels: Vec<(String, AssetType)> = labels
            .into_iter()
            .map(|(label, asset_type)| (label.into(), asset_type))
            .collect();
        let context = Arc::clone(self);
        tokio::spawn(async move { context.initialize(labels).await })
    }

    /// Ready gate. Fires once, when initialization completes; never re-arms.
    #[must_use]
    pub fn wait_for_init(&self) -> Listener<()> {
        self.ready.clone()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ContextState {
        *lock(&self.state)
    }

    /// Whether loads are accepted
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ContextState::Ready
    }

    // ------------------------------------------------------------------------
    // Index lookups
    // ------------------------------------------------------------------------

    /// Find the locator a name resolves to.
    ///
    /// # Errors
    ///
    /// See [`LocationIndex::find`].
    pub fn find(&self, asset_type: AssetType, name: &str) -> Result<Locator, AssetError> {
        self.read_index().find(asset_type, name).cloned()
    }

    /// Find the locators a list of names resolves to.
    ///
    /// # Errors
    ///
    /// See [`LocationIndex::find_all`].
    pub fn find_all<S: AsRef<str>>(
        &self,
        asset_type: AssetType,
        names: &[S],
    ) -> Result<Matches, AssetError> {
        self.read_index().find_all(asset_type, names)
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Load the indexed asset `name` resolves to.
    ///
    /// `on_complete` runs on the runtime when the value arrives.
    ///
    /// # Errors
    ///
    /// Fails without issuing anything if the context is not ready or no
    /// indexed location matches.
    pub fn load_one<T, F>(
        &self,
        name: &str,
        tracking: Tracking,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        self.check_ready()?;
        let locator = self
            .find(AssetType::of::<T>(), name)
            .inspect_err(|err| self.reject(err))?;

        let request = LoadRequest::Locator(locator);
        let handle = self.new_handle(&request, tracking)?;
        self.settle(&handle, self.loader.load_one(request, handle.clone(), on_complete))
    }

    /// Load every indexed asset matching any of `names`, as one operation.
    ///
    /// Under [`LookupMode::BestEffort`] names without a match are logged and
    /// skipped; under [`LookupMode::Strict`] they fail the request.
    ///
    /// # Errors
    ///
    /// Fails without issuing anything if the context is not ready, nothing
    /// matches, or (strict mode) some name matches nothing.
    pub fn load_many<T, F, S>(
        &self,
        names: &[S],
        tracking: Tracking,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Vec<Arc<T>>) + Send + 'static,
        S: AsRef<str>,
    {
        self.check_ready()?;
        let asset_type = AssetType::of::<T>();
        let matches = self
            .find_all(asset_type, names)
            .inspect_err(|err| self.reject(err))?;

        if matches.locators.is_empty() {
            let err = AssetError::NotFound {
                asset_type,
                name: matches.missing.join(", "),
            };
            self.reject(&err);
            return Err(err);
        }
        if !matches.is_complete() {
            match self.config.lookup_mode {
                LookupMode::Strict => {
                    let err = AssetError::PartialMatch {
                        missing: matches.missing,
                    };
                    self.reject(&err);
                    return Err(err);
                }
                LookupMode::BestEffort => {
                    log::warn!(
                        "No {asset_type} assets found matching {:?}; loading the rest",
                        matches.missing
                    );
                }
            }
        }

        let request = LoadRequest::Locators(matches.locators);
        let handle = self.new_handle(&request, tracking)?;
        self.settle(&handle, self.loader.load_many(request, handle.clone(), on_complete))
    }

    /// Load the asset at a raw address, bypassing the index.
    ///
    /// # Errors
    ///
    /// Fails without issuing anything if the context is not ready.
    pub fn load_by_address<T, F>(
        &self,
        address: &str,
        tracking: Tracking,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        self.check_ready()?;
        let request = LoadRequest::Address(address.to_string());
        let handle = self.new_handle(&request, tracking)?;
        self.settle(&handle, self.loader.load_one(request, handle.clone(), on_complete))
    }

    /// Load the union of several raw addresses, bypassing the index.
    ///
    /// # Errors
    ///
    /// Fails without issuing anything if the context is not ready.
    pub fn load_by_addresses<T, F, S>(
        &self,
        addresses: &[S],
        tracking: Tracking,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Vec<Arc<T>>) + Send + 'static,
        S: AsRef<str>,
    {
        self.check_ready()?;
        let request = LoadRequest::Addresses(owned(addresses));
        let handle = self.new_handle(&request, tracking)?;
        self.settle(&handle, self.loader.load_many(request, handle.clone(), on_complete))
    }

    /// Load every asset of type `T` carrying `label`, bypassing the index.
    ///
    /// # Errors
    ///
    /// Fails without issuing anything if the context is not ready.
    pub fn load_by_label<T, F>(
        &self,
        label: &str,
        tracking: Tracking,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Vec<Arc<T>>) + Send + 'static,
    {
        self.load_by_labels(&[label], tracking, on_complete)
    }

    /// Load the union of every asset of type `T` carrying any of `labels`.
    ///
    /// # Errors
    ///
    /// Fails without issuing anything if the context is not ready.
    pub fn load_by_labels<T, F, S>(
        &self,
        labels: &[S],
        tracking: Tracking,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Vec<Arc<T>>) + Send + 'static,
        S: AsRef<str>,
    {
        self.check_ready()?;
        let request = LoadRequest::Labels(owned(labels));
        let handle = self.new_handle(&request, tracking)?;
        self.settle(&handle, self.loader.load_many(request, handle.clone(), on_complete))
    }

    // ------------------------------------------------------------------------
    // Release and scopes
    // ------------------------------------------------------------------------

    /// Release one handle now.
    ///
    /// Meant for untracked loads, which no scope will release. Returns false
    /// if the handle was already released.
    pub fn release(&self, handle: &LoadHandle) -> bool {
        match handle.release() {
            Release::Now(raw) => {
                if self.backend.is_valid(raw) {
                    self.backend.release(raw);
                    self.stats.record_released(1);
                } else {
                    self.stats.record_stale(1);
                }
                true
            }
            Release::Deferred => true,
            Release::AlreadyReleased => false,
        }
    }

    /// End `scope`, releasing everything tracked under it.
    ///
    /// Ending a scope twice, or one that holds nothing, does nothing.
    pub fn end_scope(&self, scope: &Scope) -> ReleaseReport {
        let report = self.registry.release_scope(scope, self.backend.as_ref());
        self.stats.record_released(report.released);
        self.stats.record_stale(report.stale);
        if report.total() > 0 {
            log::info!(
                "Released {} asset handles for scope '{scope}' ({} pending)",
                report.released,
                report.pending
            );
        }
        report
    }

    /// Make `scope` the one [`Tracking::Current`] loads are tracked under
    pub fn enter_scope(&self, scope: Scope) {
        log::debug!("Entering scope '{scope}'");
        *self
            .current_scope
            .write()
            .unwrap_or_else(PoisonError::into_inner) = scope;
    }

    /// Scope [`Tracking::Current`] loads are tracked under
    #[must_use]
    pub fn current_scope(&self) -> Scope {
        self.current_scope
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply every lifecycle event ready in `queue`.
    ///
    /// Returns the combined release report of all ended scopes.
    pub fn process_events(&self, queue: &mut LifecycleQueue) -> ReleaseReport {
        let mut total = ReleaseReport::default();
        for event in queue.drain() {
            match event {
                ScopeEvent::Entered { scope } => self.enter_scope(scope),
                ScopeEvent::Unloaded { scope } => {
                    let report = self.end_scope(&scope);
                    total.released += report.released;
                    total.stale += report.stale;
                    total.pending += report.pending;
                    total.already_released += report.already_released;
                }
            }
        }
        total
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Handle registry
    #[must_use]
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Current load counters
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn check_ready(&self) -> Result<(), AssetError> {
        if self.is_ready() {
            return Ok(());
        }
        let err = AssetError::NotInitialized;
        self.reject(&err);
        Err(err)
    }

    fn reject(&self, err: &AssetError) {
        log::error!("{err}");
        self.stats.record_rejected();
    }

    fn new_handle(
        &self,
        request: &LoadRequest,
        tracking: Tracking,
    ) -> Result<LoadHandle, AssetError> {
        let handle = LoadHandle::new(request.describe());
        let scope = match tracking {
            Tracking::Current => Some(self.current_scope()),
            Tracking::Scope(scope) => Some(scope),
            Tracking::Untracked => None,
        };
        if let Some(scope) = scope {
            self.registry.track(&handle, scope)?;
        }
        Ok(handle)
    }

    /// Mark the handle dead if its load could not be issued.
    fn settle(
        &self,
        handle: &LoadHandle,
        issued: Result<LoadTicket, AssetError>,
    ) -> Result<LoadTicket, AssetError> {
        issued.inspect_err(|err| {
            let _ = handle.release();
            self.reject(err);
        })
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, LocationIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets an abandoned initialization so it can be retried.
struct InitGuard<'a> {
    state: &'a Mutex<ContextState>,
    finished: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("Asset context initialization was cancelled before it finished");
            *lock(self.state) = ContextState::Uninitialized;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn owned<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|item| item.as_ref().to_string()).collect()
}
