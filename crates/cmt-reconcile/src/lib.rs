//! cmtool reconcilers
//!
//! Consumers of the candidate store that keep a local selection valid as
//! the ranked list is replaced:
//!
//! - [`Reconciler`]: mount/notify/unmount lifecycle around one selection
//! - [`ScriptGenerator`]: builds infrastructure-script requests
//! - [`ProvisionForm`]: builds provision requests and records provisioning
//!   actions into the activity log

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod provision;
pub mod reconciler;
pub mod script;

pub use error::ReconcileError;
pub use provision::{ProvisionForm, ProvisionReceipt, ProvisionRequest, StackIds};
pub use reconciler::{reconcile_selection, Reconciler, DISPLAY_LIMIT};
pub use script::{ScriptGenerator, ScriptRequest};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
