//! Asset location, loading and release
//!
//! Provides a label-indexed asset cache over an [`AssetBackend`]:
//! - A location index built from label scans
//! - Asynchronous loads with completion continuations and ready tickets
//! - Scope-bound handle tracking with batch release

mod backend;
mod context;
mod error;
mod handle;
mod index;
mod loader;
mod locator;
mod memory;
mod registry;
mod signal;

pub use backend::{AssetBackend, BackendError, ErasedAsset, Loaded, RawHandle};
pub use context::{AssetContext, ContextState, InitReport};
pub use error::AssetError;
pub use handle::{HandleId, LoadHandle};
pub use index::{LocationIndex, MatchPolicy, Matches};
pub use loader::{LoadStatus, LoadTicket};
pub use locator::{AssetType, Locator, LocatorId};
pub use memory::MemoryBackend;
pub use registry::{HandleRegistry, ReleaseReport, Scope, Tracking};
pub use signal::{Abandoned, Listener, Trigger, signal};
