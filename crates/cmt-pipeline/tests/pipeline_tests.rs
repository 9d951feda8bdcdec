//! Functional tests for the recommendation pipeline.
//!
//! Each test drives a full run against a scripted sizing service and checks
//! what reached the candidate store.

use cmt_pipeline::{
    PipelineConfig, PipelineWarning, PriceQuote, PublishPolicy, RecommendationPipeline, RunOutcome,
    RunState, SizingRequest,
};
use cmt_test_utils::{best_pick, candidate, growing_specs, memory_store, spec, StubSizingService};
use cmt_types::CandidateList;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn request() -> SizingRequest {
    SizingRequest::new(2, 4.0).unwrap()
}

fn pipeline(service: StubSizingService) -> (Arc<StubSizingService>, RecommendationPipeline) {
    let (_, store) = memory_store();
    let service = Arc::new(service);
    let pipeline = RecommendationPipeline::new(service.clone(), store, PipelineConfig::default());
    (service, pipeline)
}

/// Eligible lookup fails entirely: the store keeps its previous list and the
/// caller gets a failure outcome.
#[tokio::test]
async fn eligible_failure_leaves_store_untouched() {
    let (_, store) = memory_store();
    let previous = CandidateList::new(vec![candidate("m5.large", 2, 8.0, Some(0.096))]);
    store.write(previous.clone());

    let writes = Arc::new(AtomicUsize::new(0));
    let counter = writes.clone();
    store.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let service = Arc::new(
        StubSizingService::new()
            .with_best_pick(best_pick("t3.medium", 0.0416))
            .failing_eligible("connection refused"),
    );
    let pipeline = RecommendationPipeline::new(service, store.clone(), PipelineConfig::default());

    let report = pipeline.run(request()).await;

    assert!(matches!(report.outcome, RunOutcome::FailedFetch { ref message } if message.contains("connection refused")));
    assert_eq!(pipeline.state(), RunState::FailedFetch);
    assert_eq!(*store.read(), previous);
    assert_eq!(writes.load(Ordering::SeqCst), 0);
    // the other lookup's result is still surfaced
    assert_eq!(report.best_pick.unwrap().instance_type, "t3.medium");
}

/// Twelve eligible entries, prices for eight of the first ten: exactly ten
/// are published, eight priced, ranked with the unpriced two last.
#[tokio::test]
async fn twelve_eligible_eight_priced() {
    let specs = growing_specs(12);
    let quotes: Vec<PriceQuote> = (1..=8)
        .map(|i| PriceQuote::new(format!("size-{i}"), 1.0 / f64::from(i)))
        .collect();
    let (service, pipeline) = pipeline(
        StubSizingService::new()
            .with_best_pick(best_pick("size-1", 1.0))
            .with_eligible(specs)
            .with_prices(quotes),
    );

    let report = pipeline.run(request()).await;
    assert_eq!(report.outcome, RunOutcome::Published { count: 10, priced: 8 });
    assert_eq!(pipeline.state(), RunState::Published);

    let published = pipeline.store().read();
    assert_eq!(published.len(), 10);
    assert_eq!(published.priced_count(), 8);

    let order: Vec<_> = published.iter().map(|c| c.instance_type.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "size-8", "size-7", "size-6", "size-5", "size-4", "size-3", "size-2", "size-1",
            "size-9", "size-10",
        ]
    );

    // one batched lookup for exactly the first ten identifiers
    let requested = service.price_requests();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].len(), 10);
    assert!(!requested[0].contains(&"size-11".to_string()));
}

#[tokio::test]
async fn empty_eligible_result_is_no_candidates() {
    let (_, store) = memory_store();
    let previous = CandidateList::new(vec![candidate("t3.micro", 2, 1.0, Some(0.0104))]);
    store.write(previous.clone());

    let service = Arc::new(StubSizingService::new().with_eligible(Vec::new()));
    let pipeline = RecommendationPipeline::new(service.clone(), store.clone(), PipelineConfig::default());

    let report = pipeline.run(request()).await;
    assert_eq!(report.outcome, RunOutcome::FailedNoCandidates);
    assert_eq!(*store.read(), previous);
    assert!(service.price_requests().is_empty());
}

#[tokio::test]
async fn pricing_failure_publishes_unpriced() {
    let (_, pipeline) = pipeline(
        StubSizingService::new()
            .with_best_pick(best_pick("c", 0.1))
            .with_eligible(vec![spec("c", 4, 8.0), spec("a", 2, 8.0), spec("b", 2, 4.0)])
            .failing_prices("pricing api throttled"),
    );

    let report = pipeline.run(request()).await;
    assert_eq!(report.outcome, RunOutcome::Published { count: 3, priced: 0 });
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::PricingUnavailable(_))));

    let order: Vec<_> = pipeline
        .store()
        .read()
        .iter()
        .map(|c| c.instance_type.clone())
        .collect();
    assert_eq!(order, vec!["b", "a", "c"]);
}

#[tokio::test]
async fn best_pick_failure_does_not_block_publication() {
    let (_, pipeline) = pipeline(
        StubSizingService::new()
            .failing_best_pick("optimize timed out")
            .with_eligible(vec![spec("t3.medium", 2, 4.0)])
            .with_prices(vec![PriceQuote::new("t3.medium", 0.0416)]),
    );

    let report = pipeline.run(request()).await;
    assert!(report.outcome.is_published());
    assert!(report.best_pick.is_none());
    assert_eq!(
        report.warnings,
        vec![PipelineWarning::BestPickUnavailable(
            "service error: optimize timed out".to_string()
        )]
    );
}

#[tokio::test]
async fn non_positive_prices_become_absent() {
    let (_, pipeline) = pipeline(
        StubSizingService::new()
            .with_eligible(vec![spec("zero", 2, 4.0), spec("neg", 2, 4.0), spec("ok", 8, 32.0)])
            .with_prices(vec![
                PriceQuote {
                    instance_type: "zero".to_string(),
                    price_per_hour: Some(0.0),
                },
                PriceQuote {
                    instance_type: "neg".to_string(),
                    price_per_hour: Some(-0.2),
                },
                PriceQuote::new("ok", 0.5),
            ]),
    );

    pipeline.run(request()).await;
    let published = pipeline.store().read();
    assert_eq!(published.first().unwrap().instance_type, "ok");
    assert_eq!(published.priced_count(), 1);
}

#[tokio::test]
async fn each_run_replaces_the_list() {
    let (service, pipeline) = pipeline(StubSizingService::new().with_eligible(vec![spec("a", 2, 4.0)]));
    pipeline.run(request()).await;
    service.queue_eligible(Duration::ZERO, vec![spec("b", 2, 4.0)]);
    let second = pipeline.run(request()).await;

    assert_eq!(second.sequence, 2);
    let names = pipeline.store().read().instance_types();
    assert_eq!(names, vec!["b"]);
}

/// Default policy: the run that resolves last wins, even if it started first.
#[tokio::test]
async fn last_write_wins_by_default() {
    let (service, pipeline) = pipeline(StubSizingService::new());
    service.queue_eligible(Duration::from_millis(60), vec![spec("slow", 2, 4.0)]);
    service.queue_eligible(Duration::ZERO, vec![spec("fast", 2, 4.0)]);

    let (first, second) = tokio::join!(pipeline.run(request()), pipeline.run(request()));
    assert!(first.outcome.is_published());
    assert!(second.outcome.is_published());
    assert_eq!(pipeline.store().read().instance_types(), vec!["slow"]);
}

/// Guarded policy: a stale run that resolves after a newer publish is dropped.
#[tokio::test]
async fn latest_run_wins_discards_stale_results() {
    let (_, store) = memory_store();
    let service = Arc::new(StubSizingService::new());
    service.queue_eligible(Duration::from_millis(60), vec![spec("slow", 2, 4.0)]);
    service.queue_eligible(Duration::ZERO, vec![spec("fast", 2, 4.0)]);

    let config = PipelineConfig::new().with_publish_policy(PublishPolicy::LatestRunWins);
    let pipeline = RecommendationPipeline::new(service, store.clone(), config);

    let (first, second) = tokio::join!(pipeline.run(request()), pipeline.run(request()));
    assert_eq!(first.outcome, RunOutcome::Superseded { by: 2 });
    assert!(second.outcome.is_published());
    assert_eq!(store.read().instance_types(), vec!["fast"]);
}
