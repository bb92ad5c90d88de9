//! Integration tests for the retrieval benchmarker

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use ::common::provider::ContentId;
use ::common::sink::CsvSink;
use ::common::suite::retrieval::RetrievalBenchmark;
use ::common::testkit::ScriptedNetwork;
use tempfile::TempDir;

fn requests(n: usize) -> Vec<ContentId> {
    (0..n).map(|i| ContentId::new(format!("cid-{}", i))).collect()
}

#[tokio::test(start_paused = true)]
async fn checkpoints_only_at_configured_counts() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(dir.path().join("query.csv")).unwrap();

    // 45 requests at 100ms each against checkpoints {10,20,40}
    let net = ScriptedNetwork::new().with_default_retrieval(Duration::from_millis(100));
    let benchmark = RetrievalBenchmark::new(BTreeSet::from([10, 20, 40]));

    let (checkpoints, tally) = benchmark
        .run(&net, &requests(45), &mut sink)
        .await
        .unwrap();
    sink.finish().unwrap();

    assert_eq!(checkpoints.len(), 3);
    let counts: Vec<u64> = checkpoints.iter().map(|c| c.completed).collect();
    assert_eq!(counts, vec![10, 20, 40]);

    // cumulative elapsed is non-decreasing across checkpoints
    for pair in checkpoints.windows(2) {
        assert!(pair[1].cumulative_elapsed >= pair[0].cumulative_elapsed);
    }
    assert_eq!(
        checkpoints[0].cumulative_elapsed,
        Duration::from_millis(1000)
    );
    assert_eq!(
        checkpoints[2].cumulative_elapsed,
        Duration::from_millis(4000)
    );
    assert_eq!(tally.completed(), 45);
    assert_eq!(tally.failed(), 0);

    let written = std::fs::read_to_string(dir.path().join("query.csv")).unwrap();
    assert_eq!(written, "10,1000\n20,2000\n40,4000\n");
}

#[tokio::test(start_paused = true)]
async fn failures_are_timed_counted_and_non_fatal() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(dir.path().join("query.csv")).unwrap();

    let net = ScriptedNetwork::new()
        .with_retrieval("cid-0", Duration::from_millis(100))
        .with_failed_retrieval("cid-1", Duration::from_millis(250))
        .with_retrieval("cid-2", Duration::from_millis(50));

    let benchmark = RetrievalBenchmark::new(BTreeSet::from([2, 3]));
    let (checkpoints, tally) = benchmark
        .run(&net, &requests(3), &mut sink)
        .await
        .unwrap();

    // the failed fetch's elapsed time is folded into the totals and
    // indistinguishable in the checkpoint data
    assert_eq!(checkpoints.len(), 2);
    assert_eq!(
        checkpoints[0].cumulative_elapsed,
        Duration::from_millis(350)
    );
    assert_eq!(
        checkpoints[1].cumulative_elapsed,
        Duration::from_millis(400)
    );
    assert_eq!(tally.failed(), 1);
}

#[tokio::test]
async fn empty_request_list_emits_nothing() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(dir.path().join("query.csv")).unwrap();

    let net = ScriptedNetwork::new();
    let benchmark = RetrievalBenchmark::new(BTreeSet::from([10]));
    let (checkpoints, tally) = benchmark.run(&net, &[], &mut sink).await.unwrap();
    sink.finish().unwrap();

    assert!(checkpoints.is_empty());
    assert_eq!(tally.completed(), 0);
    let written = std::fs::read_to_string(dir.path().join("query.csv")).unwrap();
    assert!(written.is_empty());
}

#[tokio::test(start_paused = true)]
async fn checkpoints_past_the_request_count_never_fire() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(dir.path().join("query.csv")).unwrap();

    let net = ScriptedNetwork::new().with_default_retrieval(Duration::from_millis(10));
    let benchmark = RetrievalBenchmark::new(BTreeSet::from([10, 20]));
    let (checkpoints, _) = benchmark
        .run(&net, &requests(3), &mut sink)
        .await
        .unwrap();

    assert!(checkpoints.is_empty());
}

#[tokio::test(start_paused = true)]
async fn duplicate_identifiers_are_retried_independently() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(dir.path().join("query.csv")).unwrap();

    let net = ScriptedNetwork::new().with_retrieval("cid-dup", Duration::from_millis(40));
    let reqs = vec![ContentId::new("cid-dup"), ContentId::new("cid-dup")];

    let benchmark = RetrievalBenchmark::new(BTreeSet::from([2]));
    let (checkpoints, _) = benchmark.run(&net, &reqs, &mut sink).await.unwrap();

    assert_eq!(checkpoints.len(), 1);
    assert_eq!(
        checkpoints[0].cumulative_elapsed,
        Duration::from_millis(80)
    );
}
