//! Integration tests for host-side worker supervision
//!
//! Exercises `WorkerProcess` and `WorkerRegistry` against real
//! subprocesses, using small shell scripts as stand-in workers.

use std::time::Duration;

use line_bridge::{WorkerError, WorkerProcess, WorkerRegistry};

/// Test helper to spawn a shell one-liner as a worker
fn spawn_sh(script: &str) -> WorkerProcess {
    WorkerProcess::spawn("sh", ["-c", script]).expect("Failed to spawn sh")
}

#[tokio::test]
async fn test_worker_result_round_trip() {
    let worker = spawn_sh(r#"printf '{"result": 42}'"#);
    let output = worker
        .wait_output::<i64>()
        .await
        .expect("Failed to collect output");

    assert_eq!(output.result, 42);
    assert!(output.stderr.is_empty());
    assert!(output.status.success());
}

#[tokio::test]
async fn test_worker_stderr_captured_alongside_result() {
    let worker = spawn_sh(r#"printf 'deprecated option' >&2; printf '{"result": "ok"}'"#);
    let output = worker
        .wait_output::<String>()
        .await
        .expect("Failed to collect output");

    assert_eq!(output.result, "ok");
    assert_eq!(output.stderr, "deprecated option");
}

#[tokio::test]
async fn test_worker_reported_error_when_no_envelope() {
    let worker = spawn_sh(r#"printf 'boom' >&2"#);
    let outcome = worker.wait_output::<serde_json::Value>().await;

    match outcome {
        Err(WorkerError::ReportedError(text)) => assert_eq!(text, "boom"),
        other => panic!("Expected ReportedError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_worker_decode_error_when_silent() {
    let worker = spawn_sh("true");
    let outcome = worker.wait_output::<serde_json::Value>().await;

    assert!(matches!(outcome, Err(WorkerError::DecodeError(_))));
}

#[tokio::test]
async fn test_worker_echo_line_through_stdin() {
    let mut worker = spawn_sh(r#"read line; printf '{"result": "%s"}' "$line""#);
    worker.send_line("hello").await.expect("Failed to send line");

    let output = worker
        .wait_output::<String>()
        .await
        .expect("Failed to collect output");

    assert_eq!(output.result, "hello");
}

#[tokio::test]
async fn test_worker_nonzero_exit_with_envelope_is_success() {
    let worker = spawn_sh(r#"printf '{"result": "partial"}'; exit 3"#);
    let output = worker
        .wait_output::<String>()
        .await
        .expect("Failed to collect output");

    assert_eq!(output.result, "partial");
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_worker_wait_timeout() {
    let worker = spawn_sh("sleep 5");
    let outcome = worker
        .wait_output_timeout::<serde_json::Value>(Duration::from_millis(100))
        .await;

    assert!(matches!(outcome, Err(WorkerError::WaitTimeout(_))));
}

#[tokio::test]
async fn test_registry_spawns_by_name() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let script = dir.path().join("answer");
    std::fs::write(&script, "#!/bin/sh\nprintf '{\"result\": 7}'\n")
        .expect("Failed to write script");
    let mut perms = std::fs::metadata(&script)
        .expect("Failed to stat script")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).expect("Failed to set permissions");

    let registry = WorkerRegistry::from_dir(dir.path());
    let worker = registry
        .spawn("answer", Vec::<String>::new())
        .expect("Failed to spawn worker");
    let output = worker
        .wait_output::<i64>()
        .await
        .expect("Failed to collect output");

    assert_eq!(output.result, 7);
}

/// End-to-end test against the real echo worker
/// Run with: cargo test --test worker_integration -- --ignored
#[tokio::test]
#[ignore = "Requires a built echo-worker binary in target/debug"]
async fn test_echo_worker_end_to_end() {
    let mut worker = WorkerProcess::spawn("../target/debug/echo-worker", Vec::<String>::new())
        .expect("Failed to spawn echo-worker");

    worker.send_line("first").await.expect("Failed to send line");
    worker.send_line("second").await.expect("Failed to send line");

    let output = worker
        .wait_output::<Vec<String>>()
        .await
        .expect("Failed to collect output");

    assert_eq!(output.result, vec!["first", "second"]);
    assert!(output.status.success());
}
