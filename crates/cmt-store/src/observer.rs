//! Synchronous listener registry
//!
//! [`Listeners`] is the broadcast half of both the store and the activity
//! log. Delivery is synchronous and reentrant: the registry lock is never
//! held while a callback runs, so callbacks may subscribe, unsubscribe or
//! write back into the owning store.

use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Result of one notification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Callbacks that returned normally
    pub delivered: usize,
    /// Callbacks that panicked (isolated, logged)
    pub panicked: usize,
    /// Pass stopped early because a newer value was written
    pub superseded: bool,
}

/// Registered callbacks for values of type `T`
pub struct Listeners<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Listeners<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback
    pub fn add<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback; `false` if it was not registered
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.lock().iter().any(|(existing, _)| *existing == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Invoke every callback registered when the pass starts
    ///
    /// A callback removed by an earlier callback in the same pass is skipped;
    /// callbacks added during the pass first hear about the next value.
    pub fn notify(&self, value: &T) -> NotifyReport {
        self.notify_unless(value, || false)
    }

    /// Like [`notify`](Self::notify), but stops as soon as `superseded`
    /// reports that a newer value exists
    ///
    /// The owner delivers that newer value in its own pass, so callbacks
    /// not yet reached never observe the stale one.
    pub fn notify_unless<S>(&self, value: &T, superseded: S) -> NotifyReport
    where
        S: Fn() -> bool,
    {
        let pass: Vec<(SubscriptionId, Callback<T>)> = self.entries.lock().clone();
        let mut report = NotifyReport::default();

        for (id, callback) in pass {
            if superseded() {
                report.superseded = true;
                break;
            }
            if !self.contains(id) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| callback(value))) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    report.panicked += 1;
                    tracing::warn!(subscription = %id, "subscriber panicked during notification");
                }
            }
        }

        report
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn add_notify_remove() {
        let listeners = Listeners::<u32>::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        let id = listeners.add(move |v| {
            seen_clone.fetch_add(*v as usize, Ordering::SeqCst);
        });

        assert_eq!(listeners.notify(&3).delivered, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        assert_eq!(listeners.notify(&3).delivered, 0);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn panicking_callback_does_not_block_others() {
        let listeners = Listeners::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        listeners.add(|_| panic!("boom"));
        let hits_clone = hits.clone();
        listeners.add(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        let report = listeners.notify(&1);
        assert_eq!(
            report,
            NotifyReport {
                delivered: 1,
                panicked: 1,
                superseded: false
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn self_unsubscribe_during_pass_keeps_others() {
        let listeners = Arc::new(Listeners::<u32>::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));

        let registry = listeners.clone();
        let own = own_id.clone();
        let id = listeners.add(move |_| {
            if let Some(id) = *own.lock() {
                registry.remove(id);
            }
        });
        *own_id.lock() = Some(id);

        let hits_clone = hits.clone();
        listeners.add(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(listeners.notify(&0).delivered, 2);
        assert_eq!(listeners.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_added_mid_pass_waits_for_next_value() {
        let listeners = Arc::new(Listeners::<u32>::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let registry = listeners.clone();
        let late = late_hits.clone();
        listeners.add(move |_| {
            let late = late.clone();
            registry.add(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        listeners.notify(&0);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        listeners.notify(&0);
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn superseded_pass_stops_before_remaining_callbacks() {
        let listeners = Listeners::<u32>::new();
        let newer = Arc::new(AtomicUsize::new(0));
        let late_hits = Arc::new(AtomicUsize::new(0));

        let flag = newer.clone();
        listeners.add(move |_| {
            flag.store(1, Ordering::SeqCst);
        });
        let late = late_hits.clone();
        listeners.add(move |_| {
            late.fetch_add(1, Ordering::SeqCst);
        });

        let report = listeners.notify_unless(&7, || newer.load(Ordering::SeqCst) == 1);
        assert_eq!(report.delivered, 1);
        assert!(report.superseded);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
    }
}
