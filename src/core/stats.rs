//! Load statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for load activity, updated from loader tasks.
#[derive(Debug, Default)]
pub struct AssetStats {
    issued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    released: AtomicU64,
    stale: AtomicU64,
}

/// Point-in-time copy of [`AssetStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Loads handed to the backend
    pub issued: u64,
    /// Loads that delivered their values
    pub completed: u64,
    /// Loads the backend failed or that returned the wrong type
    pub failed: u64,
    /// Requests refused before reaching the backend
    pub rejected: u64,
    /// Backend handles released
    pub released: u64,
    /// Backend handles found already invalid when released
    pub stale: u64,
}

impl StatsSnapshot {
    /// Loads issued but not yet finished
    #[must_use]
    pub const fn in_flight(&self) -> u64 {
        self.issued
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }
}

impl AssetStats {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_issued(&self) {
        self.issued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self, count: usize) {
        self.released.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self, count: usize) {
        self.stale.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            issued: self.issued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_in_flight() {
        let stats = AssetStats::new();
        stats.record_issued();
        stats.record_issued();
        stats.record_completed();
        stats.record_released(3);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.issued, 2);
        assert_eq!(snapshot.in_flight(), 1);
        assert_eq!(snapshot.released, 3);
    }
}
