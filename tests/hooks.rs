// ABOUTME: Integration tests for operator hook scripts around deploy and rollback.
// ABOUTME: Installs real shell scripts into the hooks directory and checks abort and warning behavior.

mod support;

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use cutover::deploy::{DeployRequest, LOCK_FILE, RollbackRequest};
use cutover::diagnostics::WarningKind;
use cutover::error::Error;
use cutover::types::{Color, Version};
use support::{FakeRuntime, orchestrator};

fn install_hook(dir: &Path, name: &str, body: &str) {
    let hooks = dir.join("hooks");
    std::fs::create_dir_all(&hooks).unwrap();
    let path = hooks.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn seen(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("hooks").join("seen"))
        .unwrap()
        .trim()
        .to_string()
}

const RECORD_ENV: &str =
    r#"echo "$CUTOVER_COMMAND|$CUTOVER_VERSION|$CUTOVER_COLOR|$CUTOVER_PREVIOUS_VERSION" > "$(dirname "$0")/seen""#;

fn request(version: &str) -> DeployRequest {
    DeployRequest::new(Version::new(version).unwrap())
}

#[tokio::test]
async fn failing_pre_deploy_hook_aborts_before_any_change() {
    let dir = tempfile::tempdir().unwrap();
    install_hook(dir.path(), "pre-deploy", "echo 'migrations pending' >&2\nexit 3");
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    let err = orch.deploy(&request("1.0.0")).await.unwrap_err();

    match err {
        Error::Hook(message) => {
            assert!(message.contains("pre-deploy"), "{}", message);
            assert!(message.contains("migrations pending"), "{}", message);
        }
        other => panic!("expected hook error, got {:?}", other),
    }
    assert!(runtime.mutations().is_empty());
    assert!(!dir.path().join(LOCK_FILE).exists());
}

#[tokio::test]
async fn failing_post_deploy_hook_only_warns() {
    let dir = tempfile::tempdir().unwrap();
    install_hook(dir.path(), "post-deploy", "exit 1");
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    let summary = orch.deploy(&request("1.0.0")).await.unwrap();

    assert_eq!(summary.color, Color::Blue);
    assert!(orch.diagnostics().has_kind(WarningKind::Hook));
}

#[tokio::test]
async fn post_deploy_hook_sees_the_new_color() {
    let dir = tempfile::tempdir().unwrap();
    install_hook(dir.path(), "post-deploy", RECORD_ENV);
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    orch.deploy(&request("1.0.0")).await.unwrap();
    assert_eq!(seen(dir.path()), "deploy 1.0.0|1.0.0|blue|");

    orch.deploy(&request("1.1.0")).await.unwrap();
    assert_eq!(seen(dir.path()), "deploy 1.1.0|1.1.0|green|1.0.0");
}

#[tokio::test]
async fn on_error_hook_fires_when_deploy_fails() {
    let dir = tempfile::tempdir().unwrap();
    install_hook(dir.path(), "on-error", RECORD_ENV);
    let runtime = FakeRuntime::new();
    runtime.fail_compose_up();
    let orch = orchestrator(&runtime, dir.path());

    assert!(orch.deploy(&request("2.0.0")).await.is_err());
    assert!(seen(dir.path()).starts_with("deploy 2.0.0|2.0.0|"));
}

#[tokio::test]
async fn post_rollback_hook_receives_restored_version() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());
    orch.deploy(&request("1.0.0")).await.unwrap();
    orch.deploy(&request("1.1.0")).await.unwrap();

    install_hook(dir.path(), "post-rollback", RECORD_ENV);
    orch.rollback(&RollbackRequest::default()).await.unwrap();

    assert_eq!(seen(dir.path()), "rollback|1.0.0|blue|1.1.0");
}

#[tokio::test]
async fn dry_run_never_fires_hooks() {
    let dir = tempfile::tempdir().unwrap();
    install_hook(dir.path(), "pre-deploy", "exit 1");
    let runtime = FakeRuntime::new();
    let orch = orchestrator(&runtime, dir.path());

    let mut req = request("1.0.0");
    req.dry_run = true;
    let summary = orch.deploy(&req).await.unwrap();

    assert!(summary.dry_run);
    assert!(!orch.diagnostics().has_warnings());
}
