//! Asynchronous loader
//!
//! Turns a [`LoadRequest`] into one backend operation running on the tokio
//! runtime. The caller gets a [`LoadTicket`] back immediately; when the
//! backend answers, the continuation receives the typed values and the
//! ticket's ready signal fires.

use std::any::Any;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::backend::{AssetBackend, BackendError, ErasedAsset, Loaded};
use super::error::AssetError;
use super::handle::{HandleId, LoadHandle, Release};
use super::locator::{AssetType, Locator};
use super::signal::{Listener, Trigger, signal};
use crate::core::AssetStats;

/// Final state of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The continuation ran with `count` values
    Completed {
        /// Number of values delivered
        count: usize,
    },
    /// The load did not deliver; the continuation was not called
    Failed(AssetError),
}

impl LoadStatus {
    /// Whether the load delivered its values
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Ready token for an issued load.
///
/// Poll it, await it or block on it; it resolves exactly once.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    handle: LoadHandle,
    ready: Listener<LoadStatus>,
}

impl LoadTicket {
    /// Handle of the load. Untracked loads must be released through it.
    #[must_use]
    pub fn handle(&self) -> &LoadHandle {
        &self.handle
    }

    /// Non-blocking poll
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.is_fired()
    }

    /// Final status, if the load has finished
    #[must_use]
    pub fn status(&self) -> Option<LoadStatus> {
        self.ready.get()
    }

    /// Wait for the load to finish
    pub async fn wait(&self) -> LoadStatus {
        self.ready.wait().await.unwrap_or_else(|_| abandoned())
    }

    /// Block the current thread until the load finishes.
    ///
    /// Must not be called from inside an async task.
    pub fn wait_blocking(&self) -> LoadStatus {
        self.ready.wait_blocking().unwrap_or_else(|_| abandoned())
    }
}

fn abandoned() -> LoadStatus {
    LoadStatus::Failed(AssetError::Backend(BackendError::Unavailable(
        "load task ended without reporting".to_string(),
    )))
}

/// One backend operation.
#[derive(Debug, Clone)]
pub(crate) enum LoadRequest {
    Locator(Locator),
    Locators(Vec<Locator>),
    Address(String),
    Addresses(Vec<String>),
    Labels(Vec<String>),
}

impl LoadRequest {
    /// Short description for handles and log lines
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Locator(locator) => locator.key().to_string(),
            Self::Locators(locators) => {
                let keys: Vec<_> = locators.iter().map(Locator::key).collect();
                keys.join(", ")
            }
            Self::Address(address) => format!("address {address}"),
            Self::Addresses(addresses) => format!("addresses {}", addresses.join(", ")),
            Self::Labels(labels) => format!("labels {}", labels.join(", ")),
        }
    }

    async fn issue(
        &self,
        backend: &dyn AssetBackend,
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError> {
        match self {
            Self::Locator(locator) => backend.load_by_locator(locator, asset_type).await,
            Self::Locators(locators) => backend.load_by_locators(locators, asset_type).await,
            Self::Address(address) => backend.load_by_address(address, asset_type).await,
            Self::Addresses(addresses) => backend.load_by_addresses(addresses, asset_type).await,
            Self::Labels(labels) => backend.load_by_labels(labels, asset_type).await,
        }
    }
}

/// Downcast every erased value to `T`.
fn downcast_all<T: Any + Send + Sync>(assets: Vec<ErasedAsset>) -> Result<Vec<Arc<T>>, AssetError> {
    assets
        .into_iter()
        .map(|asset| {
            asset.downcast::<T>().map_err(|_| AssetError::TypeMismatch {
                expected: AssetType::of::<T>(),
            })
        })
        .collect()
}

/// Reports the outcome of one load task.
///
/// Dropped without reporting, it records a failure and fails the ticket, so a
/// panicking continuation or a cancelled task still settles.
struct Settle {
    trigger: Option<Trigger<LoadStatus>>,
    stats: Arc<AssetStats>,
    id: HandleId,
}

impl Settle {
    fn report(mut self, status: LoadStatus) {
        if let Some(trigger) = self.trigger.take() {
            trigger.fire(status);
        }
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if let Some(trigger) = self.trigger.take() {
            log::error!("Load {} ended without reporting", self.id);
            self.stats.record_failed();
            trigger.fire(abandoned());
        }
    }
}

/// Issues loads against a backend.
pub(crate) struct AsyncLoader {
    backend: Arc<dyn AssetBackend>,
    stats: Arc<AssetStats>,
}

impl AsyncLoader {
    /// Create a loader for `backend`, counting into `stats`
    #[must_use]
    pub(crate) fn new(backend: Arc<dyn AssetBackend>, stats: Arc<AssetStats>) -> Self {
        Self { backend, stats }
    }

    /// Issue a load expected to produce exactly one value.
    pub(crate) fn load_one<T, F>(
        &self,
        request: LoadRequest,
        handle: LoadHandle,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        self.spawn(request, handle, move |mut values: Vec<Arc<T>>| {
            match (values.pop(), values.is_empty()) {
                (Some(value), true) => {
                    on_complete(value);
                    Ok(1)
                }
                (found, _) => Err(AssetError::Backend(BackendError::Unavailable(format!(
                    "expected one asset, backend returned {}",
                    values.len() + usize::from(found.is_some())
                )))),
            }
        })
    }

    /// Issue a load producing any number of values.
    pub(crate) fn load_many<T, F>(
        &self,
        request: LoadRequest,
        handle: LoadHandle,
        on_complete: F,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        F: FnOnce(Vec<Arc<T>>) + Send + 'static,
    {
        self.spawn(request, handle, move |values: Vec<Arc<T>>| {
            let count = values.len();
            on_complete(values);
            Ok(count)
        })
    }

    fn spawn<T, D>(
        &self,
        request: LoadRequest,
        handle: LoadHandle,
        deliver: D,
    ) -> Result<LoadTicket, AssetError>
    where
        T: Any + Send + Sync,
        D: FnOnce(Vec<Arc<T>>) -> Result<usize, AssetError> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| AssetError::NoRuntime)?;
        let (trigger, ready) = signal();
        let ticket = LoadTicket {
            handle: handle.clone(),
            ready,
        };

        let backend = Arc::clone(&self.backend);
        let stats = Arc::clone(&self.stats);
        stats.record_issued();
        log::debug!("Issuing load {} ({})", handle.id(), request.describe());
        let settle = Settle {
            trigger: Some(trigger),
            stats: Arc::clone(&stats),
            id: handle.id(),
        };

        runtime.spawn(async move {
            let asset_type = AssetType::of::<T>();
            let status = match request.issue(backend.as_ref(), asset_type).await {
                Ok(loaded) => finish::<T, D>(backend.as_ref(), &stats, &handle, loaded, deliver),
                Err(err) => {
                    log::warn!("Load {} ({}) failed: {err}", handle.id(), request.describe());
                    // Nothing to give back to the backend; keep scope release from waiting on it
                    let _ = handle.release();
                    stats.record_failed();
                    LoadStatus::Failed(err.into())
                }
            };
            settle.report(status);
        });

        Ok(ticket)
    }
}

/// Deliver a finished backend load and settle its handle.
fn finish<T, D>(
    backend: &dyn AssetBackend,
    stats: &AssetStats,
    handle: &LoadHandle,
    loaded: Loaded,
    deliver: D,
) -> LoadStatus
where
    T: Any + Send + Sync,
    D: FnOnce(Vec<Arc<T>>) -> Result<usize, AssetError>,
{
    let raw = loaded.handle;
    let released_early = handle.complete(raw);

    let outcome = downcast_all::<T>(loaded.assets).and_then(deliver);

    match outcome {
        Ok(count) => {
            if released_early {
                log::debug!("Load {} finished after its release; releasing now", handle.id());
                backend.release(raw);
                stats.record_released(1);
            }
            stats.record_completed();
            LoadStatus::Completed { count }
        }
        Err(err) => {
            log::warn!("Load {} ({}) discarded: {err}", handle.id(), handle.request());
            if released_early || handle.release() == Release::Now(raw) {
                backend.release(raw);
                stats.record_released(1);
            }
            stats.record_failed();
            LoadStatus::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::memory::MemoryBackend;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    struct Sprite(&'static str);

    fn loader(backend: &Arc<MemoryBackend>) -> (AsyncLoader, Arc<AssetStats>) {
        let stats = Arc::new(AssetStats::new());
        let dyn_backend: Arc<dyn AssetBackend> = backend.clone();
        (AsyncLoader::new(dyn_backend, Arc::clone(&stats)), stats)
    }

    #[tokio::test]
    async fn test_load_one_invokes_continuation_then_ready() {
        let backend = Arc::new(MemoryBackend::new());
        let locator = backend.insert("enemy_goblin", Sprite("goblin"), &["enemies"]);
        let (loader, stats) = loader(&backend);

        let delivered = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&delivered);
        let ticket = loader
            .load_one(
                LoadRequest::Locator(locator),
                LoadHandle::new("goblin"),
                move |sprite: Arc<Sprite>| *sink.lock().unwrap() = Some(sprite),
            )
            .unwrap();

        assert_eq!(ticket.wait().await, LoadStatus::Completed { count: 1 });
        assert_eq!(
            delivered.lock().unwrap().as_deref(),
            Some(&Sprite("goblin"))
        );
        assert!(ticket.handle().is_complete());
        assert_eq!(stats.snapshot().completed, 1);
    }

    #[tokio::test]
    async fn test_type_mismatch_fails_and_releases() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("theme", String::from("music"), &["audio"]);
        let (loader, _) = loader(&backend);

        let ticket = loader
            .load_one(
                LoadRequest::Address("theme".into()),
                LoadHandle::new("theme"),
                |_: Arc<Sprite>| panic!("continuation must not run"),
            )
            .unwrap();

        let status = ticket.wait().await;
        assert!(matches!(
            status,
            LoadStatus::Failed(AssetError::TypeMismatch { .. })
        ));
        assert_eq!(backend.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_reported_on_ticket() {
        let backend = Arc::new(MemoryBackend::new());
        let (loader, stats) = loader(&backend);

        let ticket = loader
            .load_many(
                LoadRequest::Labels(vec!["missing".into()]),
                LoadHandle::new("missing"),
                |_: Vec<Arc<Sprite>>| panic!("continuation must not run"),
            )
            .unwrap();

        assert_eq!(
            ticket.wait().await,
            LoadStatus::Failed(AssetError::Backend(BackendError::UnknownLabel(
                "missing".into()
            )))
        );
        assert!(ticket.handle().is_released());
        assert_eq!(stats.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_released_before_completion_releases_on_arrival() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("orc", Sprite("orc"), &[]);
        let (loader, _) = loader(&backend);

        let handle = LoadHandle::new("orc");
        assert_eq!(handle.release(), Release::Deferred);

        let ticket = loader
            .load_one(LoadRequest::Address("orc".into()), handle, |_: Arc<Sprite>| {})
            .unwrap();

        assert!(ticket.wait().await.is_completed());
        assert_eq!(backend.release_count(), 1);
        assert_eq!(backend.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_panicking_continuation_still_settles() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("troll", Sprite("troll"), &[]);
        let (loader, stats) = loader(&backend);

        let ticket = loader
            .load_one(
                LoadRequest::Address("troll".into()),
                LoadHandle::new("troll"),
                |_: Arc<Sprite>| panic!("continuation failed"),
            )
            .unwrap();

        assert_eq!(ticket.wait().await, abandoned());
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.in_flight(), 0);
    }

    #[test]
    fn test_spawn_outside_runtime_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let (loader, _) = loader(&backend);

        let result = loader.load_one(
            LoadRequest::Address("anything".into()),
            LoadHandle::new("anything"),
            |_: Arc<Sprite>| {},
        );
        assert!(matches!(result, Err(AssetError::NoRuntime)));
    }
}
