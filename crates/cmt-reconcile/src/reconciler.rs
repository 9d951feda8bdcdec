//! Selection reconciler
//!
//! Mounting subscribes to the candidate store and picks the first entry.
//! Every store notification re-validates the selection: it stays put while
//! its instance type is still listed, otherwise it moves to the new first
//! entry or clears. Dropping the reconciler unsubscribes it.

use crate::error::ReconcileError;
use cmt_store::{CandidateStore, SubscriptionId};
use cmt_types::{CandidateList, EligibleCandidate};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Candidates shown to the user at most
pub const DISPLAY_LIMIT: usize = 10;

/// Bring `selection` back in line with `list`
///
/// Returns `true` when the selection changed.
pub fn reconcile_selection(selection: &mut Option<String>, list: &CandidateList) -> bool {
    if let Some(current) = selection.as_deref() {
        if list.contains(current) {
            return false;
        }
    }
    let next = list.first().map(|c| c.instance_type.clone());
    let changed = *selection != next;
    *selection = next;
    changed
}

/// One view's selection, kept valid against the candidate store
pub struct Reconciler {
    name: String,
    store: Arc<CandidateStore>,
    selection: Arc<Mutex<Option<String>>>,
    subscription: SubscriptionId,
}

impl Reconciler {
    /// Subscribe to `store` and select its first candidate, if any
    #[must_use]
    pub fn mount(name: impl Into<String>, store: Arc<CandidateStore>) -> Self {
        let name = name.into();
        let selection = Arc::new(Mutex::new(None));

        let shared = Arc::clone(&selection);
        let view = name.clone();
        let latest = Arc::downgrade(&store);
        let subscription = store.subscribe(move |list: &CandidateList| {
            let mut selection = shared.lock();
            let before = selection.clone();
            // validate against what the store holds now, not what this pass carried
            let current = latest.upgrade().map(|store| store.read());
            let list = current.as_deref().unwrap_or(list);
            if reconcile_selection(&mut selection, list) {
                tracing::debug!(
                    view = %view,
                    from = ?before,
                    to = ?*selection,
                    "selection repointed"
                );
            }
        });

        // catch up with whatever is current now that notifications flow
        reconcile_selection(&mut selection.lock(), &store.read());
        tracing::debug!(view = %name, selection = ?*selection.lock(), "reconciler mounted");

        Self {
            name,
            store,
            selection,
            subscription,
        }
    }

    /// User choice of an instance type from the current list
    ///
    /// # Errors
    /// [`ReconcileError::NotInList`] if the type is not currently listed.
    pub fn select(&self, instance_type: &str) -> Result<(), ReconcileError> {
        // held across check and set so a concurrent write's notification
        // re-validates after us, never before
        let mut selection = self.selection.lock();
        if !self.store.read().contains(instance_type) {
            return Err(ReconcileError::NotInList(instance_type.to_string()));
        }
        *selection = Some(instance_type.to_string());
        Ok(())
    }

    /// Currently selected instance type
    #[must_use]
    pub fn selection(&self) -> Option<String> {
        self.selection.lock().clone()
    }

    /// Full record of the selected candidate
    #[must_use]
    pub fn selected_candidate(&self) -> Option<EligibleCandidate> {
        let selection = self.selection()?;
        self.store.read().get(&selection).cloned()
    }

    /// Live candidate list, capped at [`DISPLAY_LIMIT`]
    #[must_use]
    pub fn candidates(&self) -> Vec<EligibleCandidate> {
        self.store.read().head(DISPLAY_LIMIT).to_vec()
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
        tracing::debug!(view = %self.name, "reconciler unmounted");
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("name", &self.name)
            .field("selection", &*self.selection.lock())
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}
