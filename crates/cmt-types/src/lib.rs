//! cmtool data model
//!
//! Shared types for the sizing console core:
//! - [`EligibleCandidate`] / [`CandidateList`]: ranked compute configurations
//! - [`ActivityEvent`] / [`NewActivity`]: provisioning history entries
//!
//! Price normalization lives here so every ingestion path (service
//! responses, snapshots, hand-built fixtures) agrees on what "absent" means.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod activity;
pub mod candidate;

pub use activity::{ActivityEvent, ActivityKind, EventId, NetworkRef, NewActivity};
pub use candidate::{normalize_price, CandidateList, EligibleCandidate};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
