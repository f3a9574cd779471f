//! Asset error types

use thiserror::Error;

use super::backend::BackendError;
use super::handle::HandleId;
use super::locator::AssetType;

/// Errors reported by the asset context and loader.
///
/// Every variant describes an operation that did not happen; none of them
/// leave the context in a broken state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AssetError {
    /// A load was requested before initialization finished
    #[error("asset context is not initialized; wait for the ready gate first")]
    NotInitialized,

    /// `initialize` was called more than once
    #[error("asset context is already initialized or initializing")]
    AlreadyInitialized,

    /// No label scan produced locators of this type
    #[error("no asset found of type {asset_type}")]
    UnknownType {
        /// Requested type
        asset_type: AssetType,
    },

    /// No locator of this type matches the requested name
    #[error("no asset of type {asset_type} found matching {name:?}")]
    NotFound {
        /// Requested type
        asset_type: AssetType,
        /// Requested name
        name: String,
    },

    /// Strict lookup: some of the requested names matched nothing
    #[error("no assets found matching {missing:?}")]
    PartialMatch {
        /// Names with zero matches, in request order
        missing: Vec<String>,
    },

    /// The backend returned a value of a different type than requested
    #[error("backend returned an asset that is not a {expected}")]
    TypeMismatch {
        /// Requested type
        expected: AssetType,
    },

    /// The backend failed to scan or load
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Loads need a tokio runtime to run on
    #[error("no tokio runtime is available to run the load")]
    NoRuntime,

    /// The handle is already registered under a scope
    #[error("load handle {handle} is already tracked by a scope")]
    AlreadyTracked {
        /// Offending handle
        handle: HandleId,
    },
}
