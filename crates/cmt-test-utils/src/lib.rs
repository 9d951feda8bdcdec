//! Testing utilities for cmtool workspace
//!
//! Shared fixtures, a scriptable sizing service and a failing snapshot
//! backend.

#![allow(missing_docs)]

use async_trait::async_trait;
use cmt_pipeline::{BestPick, EligibleSpec, LookupError, PriceQuote, SizingRequest, SizingService};
use cmt_store::{CandidateStore, MemorySnapshot, SnapshotBackend, SnapshotError};
use cmt_types::EligibleCandidate;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub fn spec(instance_type: &str, vcpu: u32, memory_gb: f64) -> EligibleSpec {
    EligibleSpec::new(instance_type, vcpu, memory_gb)
}

pub fn candidate(instance_type: &str, vcpu: u32, memory_gb: f64, price: Option<f64>) -> EligibleCandidate {
    EligibleCandidate::new(instance_type, vcpu, memory_gb).with_price(price)
}

pub fn best_pick(instance_type: &str, price: f64) -> BestPick {
    BestPick {
        instance_type: instance_type.to_string(),
        price_per_hour: Some(price),
        vcpu: None,
        memory_gb: None,
    }
}

/// `count` specs of growing size, `size-1`, `size-2`, ...
pub fn growing_specs(count: u32) -> Vec<EligibleSpec> {
    (1..=count)
        .map(|i| spec(&format!("size-{i}"), 2 * i, 4.0 * f64::from(i)))
        .collect()
}

/// Store backed by an inspectable in-memory snapshot
pub fn memory_store() -> (Arc<MemorySnapshot>, Arc<CandidateStore>) {
    let backend = Arc::new(MemorySnapshot::new());
    let store = Arc::new(CandidateStore::open_candidates(backend.clone()));
    (backend, store)
}

/// Backend whose reads and/or writes always fail
#[derive(Debug, Default)]
pub struct FailingSnapshot {
    pub fail_load: bool,
    pub fail_save: bool,
}

impl FailingSnapshot {
    pub fn always() -> Self {
        Self {
            fail_load: true,
            fail_save: true,
        }
    }
}

impl SnapshotBackend for FailingSnapshot {
    fn load(&self, _key: &str) -> Result<Option<String>, SnapshotError> {
        if self.fail_load {
            Err(SnapshotError::Unavailable("load disabled".to_string()))
        } else {
            Ok(None)
        }
    }

    fn save(&self, _key: &str, _document: &str) -> Result<(), SnapshotError> {
        if self.fail_save {
            Err(SnapshotError::Unavailable("save disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

type Scripted<T> = Result<T, String>;

/// Scriptable [`SizingService`]
///
/// Each lookup returns its configured default; eligible responses can also
/// be queued with a delay to force runs to finish out of order.
#[derive(Debug)]
pub struct StubSizingService {
    best: Mutex<Scripted<BestPick>>,
    eligible: Mutex<Scripted<Vec<EligibleSpec>>>,
    eligible_queue: Mutex<VecDeque<(Duration, Scripted<Vec<EligibleSpec>>)>>,
    prices: Mutex<Scripted<Vec<PriceQuote>>>,
    price_requests: Mutex<Vec<Vec<String>>>,
    eligible_calls: Mutex<usize>,
}

impl StubSizingService {
    pub fn new() -> Self {
        Self {
            best: Mutex::new(Err("best pick not configured".to_string())),
            eligible: Mutex::new(Ok(Vec::new())),
            eligible_queue: Mutex::new(VecDeque::new()),
            prices: Mutex::new(Ok(Vec::new())),
            price_requests: Mutex::new(Vec::new()),
            eligible_calls: Mutex::new(0),
        }
    }

    pub fn with_best_pick(self, pick: BestPick) -> Self {
        *self.best.lock() = Ok(pick);
        self
    }

    pub fn failing_best_pick(self, message: &str) -> Self {
        *self.best.lock() = Err(message.to_string());
        self
    }

    pub fn with_eligible(self, specs: Vec<EligibleSpec>) -> Self {
        *self.eligible.lock() = Ok(specs);
        self
    }

    pub fn failing_eligible(self, message: &str) -> Self {
        *self.eligible.lock() = Err(message.to_string());
        self
    }

    pub fn with_prices(self, quotes: Vec<PriceQuote>) -> Self {
        *self.prices.lock() = Ok(quotes);
        self
    }

    pub fn failing_prices(self, message: &str) -> Self {
        *self.prices.lock() = Err(message.to_string());
        self
    }

    /// Queue a one-shot eligible response delivered after `delay`
    pub fn queue_eligible(&self, delay: Duration, specs: Vec<EligibleSpec>) {
        self.eligible_queue.lock().push_back((delay, Ok(specs)));
    }

    /// Instance-type sets passed to `batch_prices`, in call order
    pub fn price_requests(&self) -> Vec<Vec<String>> {
        self.price_requests.lock().clone()
    }

    pub fn eligible_calls(&self) -> usize {
        *self.eligible_calls.lock()
    }
}

impl Default for StubSizingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SizingService for StubSizingService {
    async fn best_pick(&self, _request: &SizingRequest) -> Result<BestPick, LookupError> {
        self.best.lock().clone().map_err(LookupError::Service)
    }

    async fn eligible(&self, _request: &SizingRequest) -> Result<Vec<EligibleSpec>, LookupError> {
        *self.eligible_calls.lock() += 1;
        let queued = self.eligible_queue.lock().pop_front();
        let scripted = match queued {
            Some((delay, scripted)) => {
                tokio::time::sleep(delay).await;
                scripted
            }
            None => self.eligible.lock().clone(),
        };
        scripted.map_err(LookupError::Service)
    }

    async fn batch_prices(&self, instance_types: &[String]) -> Result<Vec<PriceQuote>, LookupError> {
        self.price_requests.lock().push(instance_types.to_vec());
        self.prices.lock().clone().map_err(LookupError::Service)
    }
}
