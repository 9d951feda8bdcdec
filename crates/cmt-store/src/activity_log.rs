//! Bounded activity log
//!
//! Newest-first history of provisioning events, capped at a fixed capacity
//! with oldest-out eviction. Recency is append order: the event appended
//! last is always at index 0, whatever timestamp the caller supplied.

use crate::observer::{Listeners, SubscriptionId};
use crate::snapshot::SnapshotBackend;
use chrono::Utc;
use cmt_types::{ActivityEvent, NewActivity};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default log capacity
pub const ACTIVITY_CAPACITY: usize = 100;

/// Reserved snapshot key for the activity log
pub const ACTIVITY_KEY: &str = "cmtool.activity_log";

/// Capacity-bounded, newest-first event history
pub struct ActivityLog {
    capacity: usize,
    entries: RwLock<Arc<Vec<ActivityEvent>>>,
    listeners: Listeners<Vec<ActivityEvent>>,
    persistence: Option<Arc<dyn SnapshotBackend>>,
    append_lock: Mutex<()>,
    generation: AtomicU64,
}

impl ActivityLog {
    /// Memory-only log
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Arc::new(Vec::new())),
            listeners: Listeners::new(),
            persistence: None,
            append_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Log persisted under [`ACTIVITY_KEY`], restored from its last snapshot
    ///
    /// The stored order is kept and truncated to `capacity`; an unreadable
    /// or malformed snapshot starts an empty log.
    #[must_use]
    pub fn persistent(capacity: usize, backend: Arc<dyn SnapshotBackend>) -> Self {
        let mut log = Self::new(capacity);
        let mut restored = match backend.load(ACTIVITY_KEY) {
            Ok(Some(document)) => serde_json::from_str::<Vec<ActivityEvent>>(&document)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "malformed activity snapshot; starting empty");
                    Vec::new()
                }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "activity snapshot unreadable; starting empty");
                Vec::new()
            }
        };
        restored.truncate(log.capacity);

        log.entries = RwLock::new(Arc::new(restored));
        log.persistence = Some(backend);
        log
    }

    /// Complete, prepend and broadcast an event
    ///
    /// Returns the stored event with its generated id/timestamp filled in.
    pub fn append(&self, activity: NewActivity) -> ActivityEvent {
        let event = activity.complete(Utc::now());

        let (generation, current) = {
            let _guard = self.append_lock.lock();
            let previous = self.read();
            let keep = previous.len().min(self.capacity - 1);

            let mut next = Vec::with_capacity(keep + 1);
            next.push(event.clone());
            next.extend_from_slice(&previous[..keep]);
            let next = Arc::new(next);

            *self.entries.write() = Arc::clone(&next);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.persist(&next);
            (generation, next)
        };

        tracing::debug!(id = %event.id, kind = %event.kind, len = current.len(), "activity appended");
        // an append from inside a callback delivers the longer sequence itself
        self.listeners
            .notify_unless(&current, || self.generation.load(Ordering::SeqCst) != generation);
        event
    }

    /// Current events, newest first
    #[inline]
    #[must_use]
    pub fn read(&self) -> Arc<Vec<ActivityEvent>> {
        Arc::clone(&*self.entries.read())
    }

    /// Register a callback invoked with the full sequence after each append
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Vec<ActivityEvent>) + Send + Sync + 'static,
    {
        self.listeners.add(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn persist(&self, events: &[ActivityEvent]) {
        let Some(backend) = &self.persistence else {
            return;
        };
        let result = serde_json::to_string(events)
            .map_err(crate::SnapshotError::from)
            .and_then(|document| backend.save(ACTIVITY_KEY, &document));
        if let Err(e) = result {
            tracing::warn!(error = %e, "activity snapshot save failed");
        }
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(ACTIVITY_CAPACITY)
    }
}

impl fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityLog")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("persistent", &self.persistence.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MemorySnapshot;
    use cmt_types::ActivityKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn append_prepends() {
        let log = ActivityLog::default();
        log.append(NewActivity::new(ActivityKind::Create).with_id("first"));
        log.append(NewActivity::new(ActivityKind::Destroy).with_id("second"));

        let events = log.read();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id.as_str(), "second");
        assert_eq!(events[1].id.as_str(), "first");
    }

    #[test]
    fn append_evicts_oldest_at_capacity() {
        let log = ActivityLog::new(3);
        for i in 0..5 {
            log.append(NewActivity::new(ActivityKind::Create).with_id(format!("e{i}").as_str()));
        }

        let ids: Vec<_> = log.read().iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["e4", "e3", "e2"]);
    }

    #[test]
    fn subscribers_receive_full_sequence() {
        let log = ActivityLog::default();
        let last_len = Arc::new(AtomicUsize::new(0));

        let seen = last_len.clone();
        log.subscribe(move |events| seen.store(events.len(), Ordering::SeqCst));

        log.append(NewActivity::new(ActivityKind::Create));
        log.append(NewActivity::new(ActivityKind::Create));
        assert_eq!(last_len.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn earlier_reads_are_unaffected_by_appends() {
        let log = ActivityLog::default();
        log.append(NewActivity::new(ActivityKind::Create));
        let before = log.read();
        log.append(NewActivity::new(ActivityKind::Destroy));

        assert_eq!(before.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn persistent_log_restores_and_truncates() {
        let backend = Arc::new(MemorySnapshot::new());
        {
            let log = ActivityLog::persistent(5, backend.clone());
            for i in 0..5 {
                log.append(NewActivity::new(ActivityKind::Create).with_id(format!("e{i}").as_str()));
            }
        }

        let restored = ActivityLog::persistent(3, backend);
        let ids: Vec<_> = restored.read().iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["e4", "e3", "e2"]);
    }

    #[test]
    fn malformed_activity_snapshot_starts_empty() {
        let backend = Arc::new(MemorySnapshot::new());
        backend.insert_raw(ACTIVITY_KEY, "\"nope\"");
        let log = ActivityLog::persistent(ACTIVITY_CAPACITY, backend);
        assert!(log.is_empty());
    }
}
