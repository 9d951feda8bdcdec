//! Console wiring against file snapshots and a scripted service

use cmt_console::{Console, ConsoleConfig};
use cmt_pipeline::{PriceQuote, RunOutcome};
use cmt_store::JsonFileSnapshot;
use cmt_test_utils::{spec, StubSizingService};
use cmt_types::{ActivityKind, NewActivity};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;

fn service() -> Arc<StubSizingService> {
    Arc::new(
        StubSizingService::new()
            .with_eligible(vec![spec("m5.large", 2, 8.0), spec("t3.medium", 2, 4.0)])
            .with_prices(vec![PriceQuote::new("t3.medium", 0.0416)]),
    )
}

fn console(dir: &Path, service: Arc<StubSizingService>) -> Console {
    let config = ConsoleConfig::new().with_state_dir(dir).with_region("eu-central-1");
    Console::with_parts(config, service, Arc::new(JsonFileSnapshot::new(dir)))
}

#[tokio::test]
async fn published_list_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = console(dir.path(), service());
    let report = first.recommend(2, 4.0).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Published { count: 2, priced: 1 });
    drop(first);

    let reopened = console(dir.path(), Arc::new(StubSizingService::new()));
    assert_eq!(
        reopened.candidates().instance_types(),
        vec!["t3.medium", "m5.large"]
    );
}

#[tokio::test]
async fn invalid_requirement_is_rejected_before_any_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let stub = service();
    let console = console(dir.path(), stub.clone());

    assert!(console.recommend(0, 4.0).await.is_err());
    assert!(console.recommend(2, -1.0).await.is_err());
    assert_eq!(stub.eligible_calls(), 0);
}

#[tokio::test]
async fn views_follow_recommendations() {
    let dir = tempfile::tempdir().unwrap();
    let console = console(dir.path(), service());
    let script = console.script_generator();
    let form = console.provision_form();

    console.recommend(2, 4.0).await.unwrap();

    let request = script.request().unwrap();
    assert_eq!(request.instance_type, "t3.medium");
    assert_eq!(request.region, "eu-central-1");
    assert_eq!(form.request().unwrap().region, "eu-central-1");
}

#[test]
fn recorded_activity_is_persisted_with_default_region() {
    let dir = tempfile::tempdir().unwrap();
    {
        let console = console(dir.path(), service());
        console.record(NewActivity::new("provision:create").instance_type("t3.medium"));
        console.record(NewActivity::new(ActivityKind::Destroy).region("us-west-2"));
    }

    let reopened = console(dir.path(), service());
    let events = reopened.activity();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, ActivityKind::Destroy);
    assert_eq!(events[0].region.as_deref(), Some("us-west-2"));
    assert_eq!(events[1].region.as_deref(), Some("eu-central-1"));
}

#[test]
fn config_file_and_environment_combine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cmtool.toml");
    std::fs::write(&path, "region = \"eu-west-1\"\nmax_candidates = 5\n").unwrap();

    let config = ConsoleConfig::from_file(&path)
        .unwrap()
        .with_overrides(|name| (name == "TARGET_REGION_CODE").then(|| "ap-south-1".to_string()))
        .unwrap();
    assert_eq!(config.region, "ap-south-1");
    assert_eq!(config.max_candidates, 5);
}
