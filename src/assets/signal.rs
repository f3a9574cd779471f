//! Single-shot completion signals
//!
//! One [`Trigger`] fires at most once; any number of [`Listener`]s observe it.
//! Firing consumes the trigger, so a signal can never be re-armed. Listeners
//! created or polled after the fact see the fired value immediately.
//!
//! # Example
//!
//! ```ignore
//! let (trigger, listener) = signal::<u32>();
//! let late = listener.clone();
//!
//! trigger.fire(3);
//! assert_eq!(late.get(), Some(3));
//! ```

use thiserror::Error;
use tokio::sync::watch;

/// The producer side was dropped without firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signal was abandoned before it fired")]
pub struct Abandoned;

/// Create a connected trigger/listener pair.
#[must_use]
pub fn signal<T: Clone + Send + Sync>() -> (Trigger<T>, Listener<T>) {
    let (tx, rx) = watch::channel(None);
    (Trigger { tx }, Listener { rx })
}

/// Producer half. Fires once.
#[derive(Debug)]
pub struct Trigger<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone + Send + Sync> Trigger<T> {
    /// Fire the signal, waking every waiting listener.
    pub fn fire(self, value: T) {
        // send_replace stores the value even with no live receivers
        self.tx.send_replace(Some(value));
    }

    /// Create another listener for this signal.
    #[must_use]
    pub fn listener(&self) -> Listener<T> {
        Listener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Consumer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Listener<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone + Send + Sync> Listener<T> {
    /// The fired value, if the signal has fired.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Non-blocking poll.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Whether the trigger was dropped without firing.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        !self.is_fired() && self.rx.has_changed().is_err()
    }

    /// Wait until the signal fires.
    ///
    /// # Errors
    ///
    /// Returns [`Abandoned`] if the trigger is dropped without firing.
    pub async fn wait(&self) -> Result<T, Abandoned> {
        let mut rx = self.rx.clone();
        let value = rx.wait_for(Option::is_some).await.map_err(|_| Abandoned)?;
        (*value).clone().ok_or(Abandoned)
    }

    /// Block the current thread until the signal fires.
    ///
    /// Must not be called from inside an async task; use [`Listener::wait`] there.
    ///
    /// # Errors
    ///
    /// Returns [`Abandoned`] if the trigger is dropped without firing.
    pub fn wait_blocking(&self) -> Result<T, Abandoned> {
        pollster::block_on(self.wait())
    }
}
