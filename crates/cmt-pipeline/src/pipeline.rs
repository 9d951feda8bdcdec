//! Recommendation pipeline
//!
//! One run:
//! 1. Join the best-pick and eligible lookups (neither failure cancels the other)
//! 2. Bail out with `FailedFetch` / `FailedNoCandidates` without touching the store
//! 3. Shortlist, batch-price, merge and rank
//! 4. Publish through [`CandidateStore::write`]

use crate::rank::rank_candidates;
use crate::service::{BestPick, EligibleSpec, SizingRequest, SizingService};
use crate::state::{validate_transition, RunState};
use cmt_store::CandidateStore;
use cmt_types::{normalize_price, CandidateList};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shortlist size taken from the eligible lookup
pub const DEFAULT_MAX_CANDIDATES: usize = 10;

/// What happens when runs finish out of order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPolicy {
    /// Whichever run resolves last overwrites the store
    #[default]
    LastWriteWins,
    /// A run older than the last published run is discarded
    LatestRunWins,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Candidates taken from the eligible lookup, in source order
    pub max_candidates: usize,
    /// Out-of-order completion handling
    pub publish_policy: PublishPolicy,
}

impl PipelineConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max.max(1);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_publish_policy(mut self, policy: PublishPolicy) -> Self {
        self.publish_policy = policy;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            publish_policy: PublishPolicy::LastWriteWins,
        }
    }
}

/// Terminal result of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Ranked list written to the store
    Published { count: usize, priced: usize },
    /// Eligible lookup succeeded with nothing usable
    FailedNoCandidates,
    /// Eligible lookup failed
    FailedFetch { message: String },
    /// Discarded because run `by` already published
    Superseded { by: u64 },
}

impl RunOutcome {
    #[must_use]
    pub fn state(&self) -> RunState {
        match self {
            Self::Published { .. } => RunState::Published,
            Self::FailedNoCandidates => RunState::FailedNoCandidates,
            Self::FailedFetch { .. } => RunState::FailedFetch,
            Self::Superseded { .. } => RunState::Superseded,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published { count, priced } => {
                write!(f, "published {count} candidates ({priced} priced)")
            }
            Self::FailedNoCandidates => f.write_str("No instances meet the requirements"),
            Self::FailedFetch { message } => {
                write!(f, "Could not load eligible instances: {message}")
            }
            Self::Superseded { by } => write!(f, "superseded by run {by}"),
        }
    }
}

/// Recoverable failure noted during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// Best-pick lookup failed; the ranked list is unaffected
    BestPickUnavailable(String),
    /// Batch price lookup failed; every candidate is unpriced
    PricingUnavailable(String),
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestPickUnavailable(e) => write!(f, "best pick unavailable: {e}"),
            Self::PricingUnavailable(e) => write!(f, "pricing unavailable: {e}"),
        }
    }
}

/// Everything a caller learns from one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Monotonic run number, starting at 1
    pub sequence: u64,
    pub outcome: RunOutcome,
    /// Present when the best-pick lookup succeeded, whatever the outcome
    pub best_pick: Option<BestPick>,
    pub warnings: Vec<PipelineWarning>,
}

/// Fetch/merge/rank/publish orchestrator
pub struct RecommendationPipeline {
    service: Arc<dyn SizingService>,
    store: Arc<CandidateStore>,
    config: PipelineConfig,
    next_sequence: AtomicU64,
    /// Sequence and state of the most recently started run
    latest: Mutex<(u64, RunState)>,
    /// Sequence of the last run that wrote to the store
    last_published: Mutex<u64>,
}

impl RecommendationPipeline {
    #[must_use]
    pub fn new(
        service: Arc<dyn SizingService>,
        store: Arc<CandidateStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            service,
            store,
            config,
            next_sequence: AtomicU64::new(1),
            latest: Mutex::new((0, RunState::Idle)),
            last_published: Mutex::new(0),
        }
    }

    /// Run the pipeline for one requirement
    ///
    /// Never fails: every remote failure becomes an outcome or a warning.
    pub async fn run(&self, request: SizingRequest) -> RunReport {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        *self.latest.lock() = (sequence, RunState::Idle);
        self.advance(sequence, RunState::Running);
        tracing::info!(
            run = sequence,
            cpu_cores = request.cpu_cores(),
            ram_gb = request.ram_gb(),
            "recommendation run started"
        );

        let mut warnings = Vec::new();
        let (best, eligible) = futures::join!(
            self.service.best_pick(&request),
            self.service.eligible(&request)
        );

        let best_pick = match best {
            Ok(pick) => Some(pick),
            Err(e) => {
                tracing::warn!(
                    run = sequence,
                    error = %e,
                    retryable = e.is_retryable(),
                    "best pick lookup failed"
                );
                warnings.push(PipelineWarning::BestPickUnavailable(e.to_string()));
                None
            }
        };

        let specs = match eligible {
            Ok(specs) => specs,
            Err(e) => {
                tracing::warn!(
                    run = sequence,
                    error = %e,
                    retryable = e.is_retryable(),
                    "eligible lookup failed; store untouched"
                );
                let outcome = RunOutcome::FailedFetch {
                    message: e.to_string(),
                };
                return self.finish(sequence, outcome, best_pick, warnings);
            }
        };

        let shortlist = shortlist(specs, self.config.max_candidates);
        if shortlist.is_empty() {
            tracing::info!(run = sequence, "no eligible candidates; store untouched");
            return self.finish(sequence, RunOutcome::FailedNoCandidates, best_pick, warnings);
        }

        let instance_types: Vec<String> =
            shortlist.iter().map(|s| s.instance_type.clone()).collect();
        let prices: HashMap<String, f64> = match self.service.batch_prices(&instance_types).await {
            Ok(quotes) => quotes
                .into_iter()
                .filter_map(|q| normalize_price(q.price_per_hour).map(|p| (q.instance_type, p)))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    run = sequence,
                    error = %e,
                    retryable = e.is_retryable(),
                    "batch price lookup failed; publishing unpriced"
                );
                warnings.push(PipelineWarning::PricingUnavailable(e.to_string()));
                HashMap::new()
            }
        };

        let merged = shortlist
            .into_iter()
            .map(|spec| {
                let price = prices.get(&spec.instance_type).copied();
                spec.into_candidate(price)
            })
            .collect();
        let ranked = CandidateList::new(rank_candidates(merged));

        let outcome = self.publish(sequence, ranked);
        self.finish(sequence, outcome, best_pick, warnings)
    }

    fn publish(&self, sequence: u64, ranked: CandidateList) -> RunOutcome {
        let mut last_published = self.last_published.lock();
        if self.config.publish_policy == PublishPolicy::LatestRunWins && *last_published > sequence
        {
            tracing::info!(run = sequence, newer = *last_published, "stale run discarded");
            return RunOutcome::Superseded {
                by: *last_published,
            };
        }

        let count = ranked.len();
        let priced = ranked.priced_count();
        let report = self.store.write(ranked);
        *last_published = (*last_published).max(sequence);
        tracing::info!(
            run = sequence,
            count,
            priced,
            persisted = report.persisted,
            subscribers = report.notified.delivered,
            "candidates published"
        );
        RunOutcome::Published { count, priced }
    }

    fn finish(
        &self,
        sequence: u64,
        outcome: RunOutcome,
        best_pick: Option<BestPick>,
        warnings: Vec<PipelineWarning>,
    ) -> RunReport {
        self.advance(sequence, outcome.state());
        RunReport {
            sequence,
            outcome,
            best_pick,
            warnings,
        }
    }

    /// Move the observable state, if `sequence` is still the latest run
    fn advance(&self, sequence: u64, to: RunState) {
        let mut latest = self.latest.lock();
        if latest.0 != sequence {
            return;
        }
        match validate_transition(latest.1, to) {
            Ok(()) => latest.1 = to,
            Err(e) => tracing::error!(run = sequence, error = %e, "run state not advanced"),
        }
    }

    /// State of the most recently started run
    #[must_use]
    pub fn state(&self) -> RunState {
        self.latest.lock().1
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<CandidateStore> {
        &self.store
    }
}

impl fmt::Debug for RecommendationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationPipeline")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Usable, de-duplicated leading specs in source order
fn shortlist(specs: Vec<EligibleSpec>, max: usize) -> Vec<EligibleSpec> {
    let mut seen = HashSet::new();
    specs
        .into_iter()
        .filter(|s| s.vcpu > 0 && s.memory_gb.is_finite() && s.memory_gb > 0.0)
        .filter(|s| seen.insert(s.instance_type.clone()))
        .take(max)
        .collect()
}
