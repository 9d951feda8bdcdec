//! Observable persistent store
//!
//! Holds one named, whole value. Every `write` replaces the value, saves a
//! snapshot on a best-effort basis and then notifies subscribers
//! synchronously. Reads never touch the backend.
//!
//! A write made while a notification pass is still running (from inside a
//! callback, or from another thread) ends that pass: subscribers it has not
//! reached yet receive only the newer value.

use crate::error::SnapshotError;
use crate::observer::{Listeners, NotifyReport, SubscriptionId};
use crate::snapshot::SnapshotBackend;
use cmt_types::CandidateList;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Reserved snapshot key for the ranked candidate list
pub const CANDIDATES_KEY: &str = "cmtool.eligible_candidates";

/// Store of the latest ranked candidate list
pub type CandidateStore = ObservableStore<CandidateList>;

/// How the initial value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    /// Snapshot found and decoded
    Restored,
    /// No snapshot stored yet
    Missing,
    /// Snapshot present but undecodable; started empty
    Malformed,
    /// Backend could not be read; started empty
    Unavailable,
}

/// What a single `write` accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Whether the snapshot save succeeded
    pub persisted: bool,
    /// Notification pass outcome
    pub notified: NotifyReport,
}

/// A named value shared between views
pub struct ObservableStore<T> {
    key: String,
    value: RwLock<Arc<T>>,
    backend: Arc<dyn SnapshotBackend>,
    listeners: Listeners<T>,
    write_lock: Mutex<()>,
    /// Bumped on every write; a pass whose generation is no longer current stops
    generation: AtomicU64,
    restore_status: RestoreStatus,
}

impl<T> ObservableStore<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    /// Open a store, restoring the last snapshot saved under `key`
    ///
    /// Never fails: unreadable or malformed snapshots start from
    /// `T::default()`.
    pub fn open(key: impl Into<String>, backend: Arc<dyn SnapshotBackend>) -> Self {
        let key = key.into();
        let (initial, restore_status) = restore(&key, backend.as_ref());
        tracing::debug!(key = %key, status = ?restore_status, "store opened");

        Self {
            key,
            value: RwLock::new(Arc::new(initial)),
            backend,
            listeners: Listeners::new(),
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            restore_status,
        }
    }

    /// Current value
    #[inline]
    #[must_use]
    pub fn read(&self) -> Arc<T> {
        Arc::clone(&*self.value.read())
    }

    /// Replace the value, snapshot it, then notify subscribers
    ///
    /// A failed save is logged and reported but never prevents the
    /// in-memory update or the notification.
    pub fn write(&self, value: T) -> WriteReport {
        let value = Arc::new(value);
        let (generation, persisted) = {
            let _guard = self.write_lock.lock();
            *self.value.write() = Arc::clone(&value);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let persisted = match self.save(&value) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "snapshot save failed; keeping in-memory value");
                    false
                }
            };
            (generation, persisted)
        };

        let notified = self
            .listeners
            .notify_unless(&value, || self.generation.load(Ordering::SeqCst) != generation);
        if notified.superseded {
            tracing::debug!(key = %self.key, generation, "notification pass superseded by a newer write");
        }
        WriteReport {
            persisted,
            notified,
        }
    }

    /// Serialize `value` and hand it to the backend
    ///
    /// # Errors
    /// Returns [`SnapshotError`] if encoding or the backend write fails.
    pub fn save(&self, value: &T) -> Result<(), SnapshotError> {
        let document = serde_json::to_string(value)?;
        self.backend.save(&self.key, &document)
    }

    /// Register a callback invoked with every new value
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.listeners.add(callback)
    }

    /// Remove a callback; `false` if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn restore_status(&self) -> RestoreStatus {
        self.restore_status
    }
}

impl ObservableStore<CandidateList> {
    /// Open the candidate store under its reserved key
    pub fn open_candidates(backend: Arc<dyn SnapshotBackend>) -> Self {
        Self::open(CANDIDATES_KEY, backend)
    }
}

impl<T> fmt::Debug for ObservableStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableStore")
            .field("key", &self.key)
            .field("backend", &self.backend)
            .field("listeners", &self.listeners)
            .field("restore_status", &self.restore_status)
            .finish_non_exhaustive()
    }
}

fn restore<T>(key: &str, backend: &dyn SnapshotBackend) -> (T, RestoreStatus)
where
    T: DeserializeOwned + Default,
{
    match backend.load(key) {
        Ok(Some(document)) => match serde_json::from_str(&document) {
            Ok(value) => (value, RestoreStatus::Restored),
            Err(e) => {
                tracing::warn!(key, error = %e, "malformed snapshot; starting empty");
                (T::default(), RestoreStatus::Malformed)
            }
        },
        Ok(None) => (T::default(), RestoreStatus::Missing),
        Err(e) => {
            tracing::warn!(key, error = %e, "snapshot unreadable; starting empty");
            (T::default(), RestoreStatus::Unavailable)
        }
    }
}
