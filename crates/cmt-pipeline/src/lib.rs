//! cmtool recommendation pipeline
//!
//! Turns a sizing requirement into the ranked candidate list every console
//! view consumes:
//!
//! 1. Fan out to the "best single pick" and "eligible candidates" lookups and
//!    wait for both to settle
//! 2. Shortlist the first eligible candidates in source order
//! 3. Batch-price the shortlist
//! 4. Merge prices, rank, and publish into the candidate store
//!
//! Remote failures never abort the process: they become a [`RunOutcome`]
//! or a [`PipelineWarning`] on the returned [`RunReport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use cmt_pipeline::{HttpSizingService, PipelineConfig, RecommendationPipeline, SizingRequest};
//!
//! # async fn example(store: std::sync::Arc<cmt_store::CandidateStore>) -> Result<(), Box<dyn std::error::Error>> {
//! let service = HttpSizingService::new("http://127.0.0.1:5000", std::time::Duration::from_secs(30))?;
//! let pipeline = RecommendationPipeline::new(std::sync::Arc::new(service), store, PipelineConfig::default());
//!
//! let report = pipeline.run(SizingRequest::new(2, 4.0)?).await;
//! println!("{}", report.outcome);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod http;
pub mod pipeline;
pub mod rank;
pub mod service;
pub mod state;

pub use error::{LookupError, PipelineError};
pub use http::HttpSizingService;
pub use pipeline::{
    PipelineConfig, PipelineWarning, PublishPolicy, RecommendationPipeline, RunOutcome, RunReport,
    DEFAULT_MAX_CANDIDATES,
};
pub use rank::{rank_candidates, rank_cmp};
pub use service::{BestPick, EligibleSpec, PriceQuote, SizingRequest, SizingService};
pub use state::{allowed_transitions, validate_transition, IllegalTransition, RunState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
