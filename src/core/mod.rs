//! Core module
//!
//! Configuration, logging, statistics and lifecycle events shared by the
//! asset system

mod config;
mod events;
pub mod logging;
mod stats;

pub use config::{AssetConfig, ConfigError, LookupMode, ScanMode};
pub use events::{LifecycleQueue, ScopeEvent};
pub use stats::{AssetStats, StatsSnapshot};
