//! Asset backend boundary
//!
//! The backend does the actual work: resolving labels to locations, fetching
//! bytes and producing asset values. This crate only consumes it through
//! [`AssetBackend`], with values type-erased so the trait stays object safe.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::locator::{AssetType, Locator};

/// A loaded asset value with its concrete type erased.
pub type ErasedAsset = Arc<dyn Any + Send + Sync>;

/// Backend-side identifier of one load operation.
///
/// Releasing it tells the backend the loaded values may be unloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub u64);

/// Result of a completed backend load.
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Operation handle to release later
    pub handle: RawHandle,
    /// Loaded values, in request order
    pub assets: Vec<ErasedAsset>,
}

/// Failures reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// No asset lives at this address
    #[error("unknown address: {0}")]
    UnknownAddress(String),
    /// No asset carries this label
    #[error("unknown label: {0}")]
    UnknownLabel(String),
    /// The locator does not resolve to a stored asset
    #[error("unknown locator: {0}")]
    UnknownLocator(String),
    /// The backend could not service the request
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous asset backend consumed by the context.
///
/// Implementations must be shareable across tasks; loads are spawned onto the
/// runtime and hold an `Arc` to the backend until they finish.
#[async_trait]
pub trait AssetBackend: Send + Sync + 'static {
    /// Discover every location tagged with `label` whose declared type is `asset_type`.
    async fn scan_label(
        &self,
        label: &str,
        asset_type: AssetType,
    ) -> Result<Vec<Locator>, BackendError>;

    /// Load a single previously scanned location.
    async fn load_by_locator(
        &self,
        locator: &Locator,
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError>;

    /// Load several previously scanned locations as one operation.
    async fn load_by_locators(
        &self,
        locators: &[Locator],
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError>;

    /// Load by raw address, bypassing any index.
    async fn load_by_address(
        &self,
        address: &str,
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError>;

    /// Load the union of several addresses as one operation.
    async fn load_by_addresses(
        &self,
        addresses: &[String],
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError>;

    /// Load the union of everything carrying any of `labels`.
    async fn load_by_labels(
        &self,
        labels: &[String],
        asset_type: AssetType,
    ) -> Result<Loaded, BackendError>;

    /// Release a completed operation. Must tolerate already-released handles.
    fn release(&self, handle: RawHandle);

    /// Whether the handle still refers to live loaded data.
    fn is_valid(&self, handle: RawHandle) -> bool;
}
