//! cmtool state layer
//!
//! Process-wide state shared between console views, as explicit service
//! objects rather than globals:
//!
//! - [`ObservableStore<T>`]: one named whole value, snapshotted on every write
//!   and broadcast synchronously to subscribers
//! - [`ActivityLog`]: newest-first, capacity-bounded event history
//! - [`SnapshotBackend`]: best-effort durability (JSON files or memory)
//!
//! # Example
//!
//! ```rust,ignore
//! use cmt_store::{CandidateStore, JsonFileSnapshot};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(JsonFileSnapshot::new(".cmtool"));
//! let store = Arc::new(CandidateStore::open_candidates(backend));
//!
//! let id = store.subscribe(|list| println!("{} candidates", list.len()));
//! store.write(ranked);
//! store.unsubscribe(id);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod activity_log;
pub mod error;
pub mod observer;
pub mod snapshot;
pub mod store;

pub use activity_log::{ActivityLog, ACTIVITY_CAPACITY, ACTIVITY_KEY};
pub use error::SnapshotError;
pub use observer::{Listeners, NotifyReport, SubscriptionId};
pub use snapshot::{JsonFileSnapshot, MemorySnapshot, SnapshotBackend};
pub use store::{CandidateStore, ObservableStore, RestoreStatus, WriteReport, CANDIDATES_KEY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
