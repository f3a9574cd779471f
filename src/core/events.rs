//! Scope lifecycle event queue
//!
//! The host pushes scene transitions into a [`LifecycleQueue`] while it runs a
//! frame; the asset context drains them at the frame boundary. The queue is
//! double-buffered, so events pushed while a batch is being processed wait
//! for the next swap.
//!
//! # Example
//!
//! ```ignore
//! // Host scene manager, during the frame
//! queue.push(ScopeEvent::Unloaded { scope: Scope::new("level_1") });
//! queue.push(ScopeEvent::Entered { scope: Scope::new("level_2") });
//!
//! // At the frame boundary
//! queue.swap();
//! context.process_events(&mut queue);
//! ```

use std::collections::VecDeque;

use crate::assets::Scope;

// ============================================================================
// Event Types
// ============================================================================

/// Lifetime transitions reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScopeEvent {
    /// A scope became active; new loads track under it
    Entered {
        /// The new active scope
        scope: Scope,
    },

    /// A scope ended; everything tracked under it is released
    Unloaded {
        /// The scope that ended
        scope: Scope,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered queue of [`ScopeEvent`]s.
#[derive(Debug)]
pub struct LifecycleQueue {
    /// Events being written this frame
    pending: VecDeque<ScopeEvent>,
    /// Events from the previous frame, ready for processing
    processing: VecDeque<ScopeEvent>,
}

impl LifecycleQueue {
    /// Default initial capacity; scene transitions are rare.
    const DEFAULT_CAPACITY: usize = 8;

    /// Create a new queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
            processing: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    /// Push an event to be processed after the next swap.
    #[inline]
    pub fn push(&mut self, event: ScopeEvent) {
        self.pending.push_back(event);
    }

    /// Make this frame's events available for processing.
    ///
    /// Unprocessed events from the previous batch are discarded.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Drain the events ready for processing, in push order.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = ScopeEvent> + '_ {
        self.processing.drain(..)
    }

    /// Check if there are events ready for processing.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Get the number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Get the number of events waiting for the next swap.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for LifecycleQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unloaded(name: &str) -> ScopeEvent {
        ScopeEvent::Unloaded {
            scope: Scope::new(name),
        }
    }

    #[test]
    fn test_events_visible_after_swap() {
        let mut queue = LifecycleQueue::new();

        queue.push(unloaded("level_1"));
        assert!(queue.is_empty(), "Events should not be visible before swap");
        assert_eq!(queue.pending_count(), 1);

        queue.swap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain().collect::<Vec<_>>(), vec![unloaded("level_1")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_double_buffer_isolation() {
        let mut queue = LifecycleQueue::new();

        queue.push(unloaded("a"));
        queue.swap();
        queue.push(unloaded("b"));

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events, vec![unloaded("a")]);

        queue.swap();
        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events, vec![unloaded("b")]);
    }
}
