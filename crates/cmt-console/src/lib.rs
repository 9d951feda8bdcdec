//! cmtool sizing console
//!
//! Configuration loading and the wiring between the candidate store, the
//! activity log, the recommendation pipeline and the reconciled views.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod console;

pub use config::{ConfigError, ConsoleConfig};
pub use console::Console;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
