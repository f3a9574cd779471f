//! In-memory asset backend
//!
//! Holds pre-built values keyed by address and tagged with labels. Loads
//! complete on the first poll. Used by the demo binary and as a test fixture.

use std::any::Any;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rustc_hash::FxHashSet;

use super::backend::{AssetBackend, BackendError, ErasedAsset, Loaded, RawHandle};
use super::locator::{AssetType, Locator, LocatorId};

/// One stored asset
struct StoredAsset {
    locator: Locator,
    labels: Vec<String>,
    value: ErasedAsset,
}

#[derive(Default)]
struct MemoryState {
    /// Stored assets in insertion order
    assets: Vec<StoredAsset>,
    /// Backend handles that have not been released or invalidated
    live: FxHashSet<RawHandle>,
}

/// Backend serving values kept in memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    next_handle: AtomicU64,
    next_locator: AtomicU64,
    releases: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `address`, tagged with `labels`.
    ///
    /// Returns the locator a label scan will report for it.
    pub fn insert<T: Any + Send + Sync>(
        &self,
        address: impl Into<String>,
        value: T,
        labels: &[&str],
    ) -> Locator {
        let id = LocatorId(self.next_locator.fetch_add(1, Ordering::Relaxed));
        let locator = Locator::new(id, address, AssetType::of::<T>());
        self.lock().assets.push(StoredAsset {
            locator: locator.clone(),
            labels: labels.iter().map(|label| (*label).to_string()).collect(),
            value: Arc::new(value),
        });
        locator
    }

    /// Allocate a live backend handle.
    pub fn issue_handle(&self) -> RawHandle {
        let raw = RawHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.lock().live.insert(raw);
        raw
    }

    /// Invalidate a handle behind the context's back, as an external unload would.
    pub fn invalidate(&self, handle: RawHandle) {
        self.lock().live.remove(&handle);
    }

    /// Number of successful `release` calls
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    /// Number of handles still live
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.lock().live.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded(&self, assets: Vec<ErasedAsset>) -> Loaded {
        Loaded {
            handle: self.issue_handle(),
            assets,
        }
    }
}

/// Append `asset` unless a value with the same locator is already present.
fn push_unique(out: &mut Vec<ErasedAsset>, seen: &mut FxHashSet<LocatorId>, asset: &StoredAsset) {
    if seen.insert(asset.locator.id()) {
        out.push(Arc::clone(&asset.value));
    }
}

#[async_trait]
impl AssetBackend for MemoryBackend {
    async fn scan_label(
        &self,
        label: &str,
        asset_type: AssetType,
    ) -> Result<Vec<Locator>, BackendError> {
        Ok(self
            .lock()
            .assets
            .iter()
            .filter(|asset| {
                asset.locator.asset_type() == asset_type && asset.labels.iter().any(|l| l == label)
            })
            .map(|asset| asset.locator.clone())
            .collect())
    }

    async fn load_by_locator(
        &self,
        locator: &Locator,
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError> {
        self.load_by_locators(std::slice::from_ref(locator), asset_type)
            .await
    }

    async fn load_by_locators(
        &self,
        locators: &[Locator],
        _asset_type: AssetType,
    ) -> Result<Loaded, BackendError> {
        let assets = {
            let state = self.lock();
            locators
                .iter()
                .map(|locator| {
                    state
                        .assets
                        .iter()
                        .find(|asset| asset.locator.id() == locator.id())
                        .map(|asset| Arc::clone(&asset.value))
                        .ok_or_else(|| BackendError::UnknownLocator(locator.key().to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(self.loaded(assets))
    }

    async fn load_by_address(
        &self,
        address: &str,
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError> {
        self.load_by_addresses(&[address.to_string()], asset_type)
            .await
    }

    async fn load_by_addresses(
        &self,
        addresses: &[String],
        _asset_type: AssetType,
    ) -> Result<Loaded, BackendError> {
        let assets = {
            let state = self.lock();
            let mut seen = FxHashSet::default();
            let mut out = Vec::with_capacity(addresses.len());
            for address in addresses {
                let asset = state
                    .assets
                    .iter()
                    .find(|asset| asset.locator.key() == address)
                    .ok_or_else(|| BackendError::UnknownAddress(address.clone()))?;
                push_unique(&mut out, &mut seen, asset);
            }
            out
        };
        Ok(self.loaded(assets))
    }

    async fn load_by_labels(
        &self,
        labels: &[String],
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError> {
        let assets = {
            let state = self.lock();
            let mut seen = FxHashSet::default();
            let mut out = Vec::new();
            for label in labels {
                let mut any = false;
                for asset in state.assets.iter().filter(|asset| {
                    asset.locator.asset_type() == asset_type && asset.labels.contains(label)
                }) {
                    any = true;
                    push_unique(&mut out, &mut seen, asset);
                }
                if !any {
                    return Err(BackendError::UnknownLabel(label.clone()));
                }
            }
            out
        };
        Ok(self.loaded(assets))
    }

    fn release(&self, handle: RawHandle) {
        if self.lock().live.remove(&handle) {
            self.releases.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn is_valid(&self, handle: RawHandle) -> bool {
        self.lock().live.contains(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sprite(&'static str);

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.insert("enemy_goblin", Sprite("goblin"), &["enemies"]);
        backend.insert("enemy_orc", Sprite("orc"), &["enemies", "bosses"]);
        backend.insert("theme", String::from("music"), &["audio"]);
        backend
    }

    #[tokio::test]
    async fn test_scan_filters_by_label_and_type() {
        let backend = backend();
        let found = backend
            .scan_label("enemies", AssetType::of::<Sprite>())
            .await
            .unwrap();
        let keys: Vec<_> = found.iter().map(Locator::key).collect();
        assert_eq!(keys, ["enemy_goblin", "enemy_orc"]);

        let none = backend
            .scan_label("enemies", AssetType::of::<String>())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_labels_union_deduplicates() {
        let backend = backend();
        let labels = vec!["enemies".to_string(), "bosses".to_string()];
        let loaded = backend
            .load_by_labels(&labels, AssetType::of::<Sprite>())
            .await
            .unwrap();
        assert_eq!(loaded.assets.len(), 2);
        assert!(backend.is_valid(loaded.handle));
    }

    #[tokio::test]
    async fn test_unknown_address_fails() {
        let backend = backend();
        let err = backend
            .load_by_address("dragon", AssetType::of::<Sprite>())
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::UnknownAddress("dragon".into()));
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn test_release_counts_live_handles_only() {
        let backend = MemoryBackend::new();
        let raw = backend.issue_handle();
        backend.release(raw);
        backend.release(raw);
        assert_eq!(backend.release_count(), 1);
        assert!(!backend.is_valid(raw));
    }
}
