#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Exercises the broker client against scripted stand-ins for the elevated
//! worker. The stand-ins are plain `bash` loops speaking the wire protocol,
//! so no elevation is involved anywhere in this suite.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wgctl_broker::BrokerError;
use wgctl_broker::HelperSpawner;
use wgctl_broker::RootBroker;
use wgctl_broker::run_unprivileged;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}

/// A fake helper that answers every request line with the same canned
/// response line.
fn canned_helper(response: &str) -> RootBroker {
    let script = format!("while IFS= read -r line; do echo '{response}'; done");
    RootBroker::new(HelperSpawner::new("bash", vec!["-c".into(), script.into()]))
}

#[tokio::test]
async fn successful_command_returns_trimmed_stdout() {
    let broker = canned_helper(r#"{"stdout":"ok\n","stderr":"","returncode":0}"#);
    let out = broker.run_root(&argv(&["true"])).await.unwrap();
    assert_eq!(out, "ok");
}

#[tokio::test]
async fn worker_error_field_is_propagated_verbatim() {
    let broker = canned_helper(r#"{"error":"boom"}"#);
    let err = broker.run_root(&argv(&["true"])).await.unwrap_err();
    assert!(matches!(err, BrokerError::Helper(_)));
    assert_eq!(err.to_string(), "boom");
}

#[tokio::test]
async fn nonzero_exit_with_stderr_yields_the_stderr_text() {
    let broker = canned_helper(r#"{"stdout":"","stderr":"bad","returncode":1}"#);
    let err = broker.run_root(&argv(&["true"])).await.unwrap_err();
    assert_eq!(err.to_string(), "bad");
}

#[tokio::test]
async fn nonzero_exit_without_stderr_yields_the_exit_code_message() {
    let broker = canned_helper(r#"{"stdout":"","stderr":"","returncode":3}"#);
    let err = broker.run_root(&argv(&["true"])).await.unwrap_err();
    assert_eq!(err.to_string(), "Exit code: 3");
}

#[tokio::test]
async fn malformed_response_line_is_an_ipc_error() {
    let broker = canned_helper("definitely not json");
    let err = broker.run_root(&argv(&["true"])).await.unwrap_err();
    assert!(matches!(err, BrokerError::Ipc(_)));
}

#[tokio::test]
async fn repeated_calls_reuse_one_worker() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("spawns");
    let script = format!(
        "echo spawned >> '{}'; while IFS= read -r line; do echo '{{\"stdout\":\"ok\",\"stderr\":\"\",\"returncode\":0}}'; done",
        marker.display()
    );
    let broker = RootBroker::new(HelperSpawner::new("bash", vec!["-c".into(), script.into()]));

    broker.warm_up().await.unwrap();
    broker.run_root(&argv(&["true"])).await.unwrap();
    broker.run_root(&argv(&["true"])).await.unwrap();

    let spawns = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(spawns.lines().count(), 1);
}

#[tokio::test]
async fn dead_worker_is_replaced_on_the_next_call() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("spawns");
    // Each incarnation serves exactly one request and then exits.
    let script = format!(
        "echo spawned >> '{}'; IFS= read -r line; echo '{{\"stdout\":\"ok\",\"stderr\":\"\",\"returncode\":0}}'",
        marker.display()
    );
    let broker = RootBroker::new(HelperSpawner::new("bash", vec!["-c".into(), script.into()]));

    broker.run_root(&argv(&["true"])).await.unwrap();
    // Give the first incarnation time to exit so liveness probing sees it.
    tokio::time::sleep(Duration::from_millis(300)).await;
    broker.run_root(&argv(&["true"])).await.unwrap();

    let spawns = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(spawns.lines().count(), 2);
}

#[tokio::test]
async fn established_worker_going_silent_is_reported_as_exit() {
    // Serves the first request, then swallows the second and exits.
    let script = "IFS= read -r line; \
                  echo '{\"stdout\":\"ok\",\"stderr\":\"\",\"returncode\":0}'; \
                  IFS= read -r line; exit 0";
    let broker = RootBroker::new(HelperSpawner::new(
        "bash",
        vec!["-c".into(), script.to_string().into()],
    ));

    broker.run_root(&argv(&["true"])).await.unwrap();
    let err = broker.run_root(&argv(&["true"])).await.unwrap_err();
    assert!(matches!(err, BrokerError::HelperExited));
    assert_eq!(err.to_string(), "Root process exited unexpectedly.");
}

#[tokio::test]
async fn unlaunchable_helper_surfaces_as_start_failure() {
    let broker = RootBroker::new(HelperSpawner::new("/nonexistent/wgctl-helper", vec![]));
    let err = broker.run_root(&argv(&["true"])).await.unwrap_err();
    assert!(matches!(err, BrokerError::StartHelper(_)));
    assert_eq!(err.to_string(), "Failed to start root process.");
}

#[tokio::test]
async fn helper_that_dies_before_replying_surfaces_as_start_failure() {
    // Simulates a declined authentication prompt: the helper comes up but its
    // pipes are useless from the first exchange.
    let broker = RootBroker::new(HelperSpawner::new(
        "bash",
        vec!["-c".into(), "exit 126".to_string().into()],
    ));
    let err = broker.run_root(&argv(&["true"])).await.unwrap_err();
    assert!(matches!(err, BrokerError::StartHelper(_)));
    assert_eq!(err.to_string(), "Failed to start root process.");
}

#[tokio::test]
async fn unprivileged_path_maps_failures_the_same_way() {
    let out = run_unprivileged(&argv(&["echo", "hello"])).await.unwrap();
    assert_eq!(out, "hello");

    let err = run_unprivileged(&argv(&["sh", "-c", "echo bad >&2; exit 1"]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "bad");

    let err = run_unprivileged(&argv(&["sh", "-c", "exit 3"]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Exit code: 3");

    let err = run_unprivileged(&argv(&["wgctl-test-no-such-binary"]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Executable 'wgctl-test-no-such-binary' not found."
    );
}
