//! Poll loop tests against a scripted status source

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use zipdeploy::deploy::poller::{poll_deployment, Options};
use zipdeploy::errors::DeployError;
use zipdeploy::http::deployments::DeploymentStatusSource;
use zipdeploy::models::deployment::{DeploymentStatus, StatusReport};

enum Step {
    Report(serde_json::Value),
    Error,
    Hang,
}

/// Replays a fixed script; the last step repeats forever
struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    fetches: AtomicU32,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fetches: AtomicU32::new(0),
        }
    }

    fn codes(codes: &[i64]) -> Self {
        Self::new(
            codes
                .iter()
                .map(|code| Step::Report(json!({"id": "d1", "status": code})))
                .collect(),
        )
    }

    fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeploymentStatusSource for ScriptedSource {
    async fn latest_deployment(&self) -> Result<StatusReport, DeployError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                match steps.front().unwrap() {
                    Step::Report(payload) => Step::Report(payload.clone()),
                    Step::Error => Step::Error,
                    Step::Hang => Step::Hang,
                }
            }
        };

        match step {
            Step::Report(payload) => Ok(StatusReport::from_payload(payload)),
            Step::Error => Err(DeployError::Internal("connection reset".to_string())),
            Step::Hang => std::future::pending().await,
        }
    }
}

fn options(interval_secs: u64, timeout_secs: u64) -> Options {
    Options {
        interval: Duration::from_secs(interval_secs),
        timeout: Duration::from_secs(timeout_secs),
    }
}

fn never() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(std::future::pending())
}

#[tokio::test(start_paused = true)]
async fn test_success_after_three_polls() {
    let source = ScriptedSource::codes(&[0, 0, 4]);

    let summary = poll_deployment(&source, &options(2, 300), never())
        .await
        .unwrap();

    assert_eq!(summary.polls, 3);
    assert_eq!(source.fetches(), 3);
    assert_eq!(summary.report.status, Some(DeploymentStatus::Success));
    assert!(summary.elapsed >= Duration::from_secs(4));
    assert!(summary.elapsed < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_immediate() {
    let source = ScriptedSource::codes(&[3]);
    let started = tokio::time::Instant::now();

    let err = poll_deployment(&source, &options(2, 300), never())
        .await
        .unwrap_err();

    match err {
        DeployError::DeploymentFailed { payload } => {
            assert_eq!(payload, json!({"id": "d1", "status": 3}));
        }
        other => panic!("expected DeploymentFailed, got {:?}", other),
    }
    assert_eq!(source.fetches(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_distinct_from_failure() {
    let source = ScriptedSource::codes(&[0, 1, 2]);

    let err = poll_deployment(&source, &options(2, 10), never())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::Timeout { timeout } if timeout == Duration::from_secs(10)
    ));
    // Fetches at t = 0, 2, 4, 6, 8
    assert_eq!(source.fetches(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_codes_keep_polling() {
    let source = ScriptedSource::new(vec![
        Step::Report(json!({"status": 7})),
        Step::Report(json!({"message": "no status here"})),
        Step::Report(json!({"status": 7})),
        Step::Report(json!({"status": 4})),
    ]);

    let summary = poll_deployment(&source, &options(2, 300), never())
        .await
        .unwrap();

    assert_eq!(summary.polls, 4);
    assert_eq!(source.fetches(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_ends_polling() {
    let source = ScriptedSource::new(vec![
        Step::Report(json!({"status": 1})),
        Step::Error,
        Step::Report(json!({"status": 4})),
    ]);
    let started = tokio::time::Instant::now();

    let err = poll_deployment(&source, &options(2, 300), never())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Internal(ref message) if message == "connection reset"));
    assert_eq!(source.fetches(), 2);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_huge_timeout_does_not_overflow() {
    let source = ScriptedSource::codes(&[0, 4]);

    let summary = poll_deployment(&source, &options(2, u64::MAX), never())
        .await
        .unwrap();

    assert_eq!(summary.polls, 2);
}

#[tokio::test(start_paused = true)]
async fn test_hung_fetch_is_bounded_by_timeout() {
    let source = ScriptedSource::new(vec![Step::Hang]);
    let started = tokio::time::Instant::now();

    let err = poll_deployment(&source, &options(2, 30), never())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Timeout { .. }));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(started.elapsed() < Duration::from_secs(31));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_polling() {
    let source = ScriptedSource::codes(&[0]);
    let shutdown = Box::pin(tokio::time::sleep(Duration::from_secs(5)));

    let err = poll_deployment(&source, &options(2, 300), shutdown)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Cancelled));
    // Fetches at t = 0, 2, 4 before the signal at t = 5
    assert_eq!(source.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_never_fetches() {
    let source = ScriptedSource::codes(&[4]);

    let err = poll_deployment(&source, &options(2, 0), never())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Timeout { .. }));
    assert_eq!(source.fetches(), 0);
}
