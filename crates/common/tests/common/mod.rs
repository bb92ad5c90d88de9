//! Shared test utilities for harness integration tests
#![allow(dead_code)]

use ::common::suite::SuitePaths;
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Lay out a request list and the two sink paths inside a temp dir.
pub fn suite_paths(dir: &TempDir, requests: &[&str]) -> SuitePaths {
    let request_list = dir.path().join("input.txt");
    let contents = if requests.is_empty() {
        String::new()
    } else {
        requests.join("\n") + "\n"
    };
    std::fs::write(&request_list, contents).unwrap();

    SuitePaths {
        request_list,
        peer_series: dir.path().join("peers-sec.csv"),
        retrieval_series: dir.path().join("query.csv"),
    }
}
