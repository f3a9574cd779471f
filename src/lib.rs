//! A label-indexed asset cache with scope-bound handle release
//!
//! This crate provides:
//! - A location index built by scanning labels on an asset backend
//! - Asynchronous loads by name, address or label with ready tickets
//! - Handle tracking per scope (scene) with idempotent batch release
//! - A one-shot ready gate for initialization

pub mod assets;
pub mod core;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{
        AssetBackend, AssetContext, AssetError, AssetType, LoadStatus, LoadTicket, MemoryBackend,
        Scope, Tracking,
    };
    pub use crate::core::{AssetConfig, LifecycleQueue, LookupMode, ScanMode, ScopeEvent};
}
