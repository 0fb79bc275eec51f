// ABOUTME: Integration tests for rollback against an in-memory runtime.
// ABOUTME: Covers one-level history, explicit versions, and refusal without state.

mod support;

use cutover::deploy::{COLOR_FILE, DeployErrorKind, DeployRequest, PREVIOUS_VERSION_FILE, RollbackRequest};
use cutover::diagnostics::WarningKind;
use cutover::types::{Color, RotatableService, Version};
use support::{FakeRuntime, deploy_kind, orchestrator, read_state};

fn request(version: &str) -> DeployRequest {
    DeployRequest::new(Version::new(version).unwrap())
}

#[tokio::test]
async fn rollback_restores_previous_version_in_the_other_color() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    orch.deploy(&request("1.0.0")).await.unwrap();
    orch.deploy(&request("1.1.0")).await.unwrap();

    let summary = orch.rollback(&RollbackRequest::default()).await.unwrap();

    assert_eq!(summary.version.as_str(), "1.0.0");
    assert_eq!(summary.color, Color::Blue);
    assert_eq!(summary.replaced, Color::Green);
    assert_eq!(read_state(dir.path(), COLOR_FILE).as_deref(), Some("blue"));
    assert_eq!(
        read_state(dir.path(), PREVIOUS_VERSION_FILE).as_deref(),
        Some("1.1.0")
    );

    for service in RotatableService::ALL {
        let blue = runtime
            .container(&service.container_name("acme", Color::Blue))
            .unwrap();
        assert_eq!(blue.version.as_deref(), Some("1.0.0"));
        assert!(runtime.container(&service.container_name("acme", Color::Green)).is_none());
    }
}

#[tokio::test]
async fn rolling_back_twice_returns_to_the_newer_release() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    orch.deploy(&request("1.0.0")).await.unwrap();
    orch.deploy(&request("1.1.0")).await.unwrap();
    orch.rollback(&RollbackRequest::default()).await.unwrap();
    let summary = orch.rollback(&RollbackRequest::default()).await.unwrap();

    assert_eq!(summary.version.as_str(), "1.1.0");
    assert_eq!(summary.color, Color::Green);
    assert_eq!(
        read_state(dir.path(), PREVIOUS_VERSION_FILE).as_deref(),
        Some("1.0.0")
    );
}

#[tokio::test]
async fn explicit_version_overrides_history() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    orch.deploy(&request("1.0.0")).await.unwrap();

    let summary = orch
        .rollback(&RollbackRequest {
            version: Some(Version::new("0.9.0").unwrap()),
        })
        .await
        .unwrap();

    assert_eq!(summary.version.as_str(), "0.9.0");
    assert_eq!(summary.color, Color::Green);
    assert!(
        runtime
            .mutations()
            .contains(&"pull ghcr.io/acme/operator:0.9.0".to_string())
    );
    assert_eq!(
        read_state(dir.path(), PREVIOUS_VERSION_FILE).as_deref(),
        Some("1.0.0")
    );
}

#[tokio::test]
async fn rollback_without_history_fails_and_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    orch.deploy(&request("1.0.0")).await.unwrap();
    runtime.clear_mutations();

    let err = orch.rollback(&RollbackRequest::default()).await.unwrap_err();

    assert_eq!(deploy_kind(&err), Some(DeployErrorKind::NoPreviousVersion));
    assert!(runtime.mutations().is_empty());
    assert_eq!(read_state(dir.path(), COLOR_FILE).as_deref(), Some("blue"));
}

#[tokio::test]
async fn rollback_without_active_color_fails() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    let err = orch.rollback(&RollbackRequest::default()).await.unwrap_err();

    assert_eq!(deploy_kind(&err), Some(DeployErrorKind::NoActiveDeployment));
}

#[tokio::test]
async fn unhealthy_rollback_keeps_current_color() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    orch.deploy(&request("1.0.0")).await.unwrap();
    orch.deploy(&request("1.1.0")).await.unwrap();
    runtime.unhealthy("acme-platform-blue");

    let err = orch.rollback(&RollbackRequest::default()).await.unwrap_err();

    assert_eq!(deploy_kind(&err), Some(DeployErrorKind::HealthCheckTimeout));
    assert_eq!(read_state(dir.path(), COLOR_FILE).as_deref(), Some("green"));
    assert_eq!(
        read_state(dir.path(), PREVIOUS_VERSION_FILE).as_deref(),
        Some("1.0.0")
    );
    assert!(runtime.container("acme-platform-green").unwrap().running);
}

#[tokio::test]
async fn missing_version_label_is_a_history_warning() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(COLOR_FILE), "green\n").unwrap();
    std::fs::write(dir.path().join(PREVIOUS_VERSION_FILE), "1.0.0\n").unwrap();

    let runtime = FakeRuntime::new();
    for service in RotatableService::ALL {
        runtime.add_container(&service.container_name("acme", Color::Green), None);
    }
    let orch = orchestrator(&runtime, dir.path());

    let summary = orch.rollback(&RollbackRequest::default()).await.unwrap();

    assert_eq!(summary.color, Color::Blue);
    assert!(orch.diagnostics().has_kind(WarningKind::History));
    assert_eq!(
        read_state(dir.path(), PREVIOUS_VERSION_FILE).as_deref(),
        Some("1.0.0")
    );
}
