// ABOUTME: Operator scripts fired around deploy and rollback.
// ABOUTME: Scripts live in <deploy dir>/hooks and receive the workflow context as CUTOVER_* variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runtime::{CommandRunner, CommandSpec, TokioCommandRunner};
use crate::types::Color;

/// Where in a workflow a script is fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    PreDeploy,
    PostDeploy,
    OnError,
    PostRollback,
}

impl HookPoint {
    pub fn script_name(self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
            HookPoint::OnError => "on-error",
            HookPoint::PostRollback => "post-rollback",
        }
    }

    /// A failing pre-deploy script stops the deploy before the lock is taken.
    /// Every other point only produces a warning.
    pub fn aborts_workflow(self) -> bool {
        self == HookPoint::PreDeploy
    }
}

/// Workflow facts handed to a script.
#[derive(Debug, Clone, Default)]
pub struct HookEnv {
    pub project: String,
    pub command: String,
    pub version: Option<String>,
    pub color: Option<Color>,
    pub previous_version: Option<String>,
}

impl HookEnv {
    pub fn new(project: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            command: command.into(),
            ..Self::default()
        }
    }

    /// Variables for the script. Unknown values are left out rather than set empty.
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("CUTOVER_VERSION", self.version.clone()),
            ("CUTOVER_COLOR", self.color.map(|c| c.to_string())),
            ("CUTOVER_PREVIOUS_VERSION", self.previous_version.clone()),
        ];
        [
            ("CUTOVER_PROJECT", self.project.clone()),
            ("CUTOVER_COMMAND", self.command.clone()),
        ]
        .into_iter()
        .chain(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, v))),
        )
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No script installed for the point.
    Absent,
    Passed,
    /// Non-zero exit, timeout, or spawn failure, with the best detail available.
    Failed(String),
}

/// Fires scripts from a hooks directory through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct Hooks<C = TokioCommandRunner> {
    dir: PathBuf,
    runner: C,
    timeout: Option<Duration>,
}

impl Hooks<TokioCommandRunner> {
    pub fn new(deploy_dir: &Path) -> Self {
        Self::with_runner(deploy_dir, TokioCommandRunner)
    }
}

impl<C: CommandRunner> Hooks<C> {
    pub fn with_runner(deploy_dir: &Path, runner: C) -> Self {
        Self {
            dir: deploy_dir.join("hooks"),
            runner,
            timeout: None,
        }
    }

    /// Kill scripts that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Path of the installed script for `point`, if any.
    pub fn script(&self, point: HookPoint) -> Option<PathBuf> {
        let path = self.dir.join(point.script_name());
        path.is_file().then_some(path)
    }

    pub async fn fire(&self, point: HookPoint, env: &HookEnv) -> HookOutcome {
        let Some(path) = self.script(point) else {
            return HookOutcome::Absent;
        };

        let mut spec = CommandSpec::new(path.to_string_lossy()).envs(env.vars());
        if let Some(timeout) = self.timeout {
            spec = spec.timeout(timeout);
        }

        tracing::info!(hook = point.script_name(), path = %path.display(), "firing hook");
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => {
                tracing::debug!(hook = point.script_name(), "hook passed");
                HookOutcome::Passed
            }
            Ok(output) => HookOutcome::Failed(output.failure_message()),
            Err(e) => HookOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{CommandOutput, RecordingRunner};

    fn hooks_dir_with(script: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("hooks")).unwrap();
        std::fs::write(dir.path().join("hooks").join(script), "#!/bin/sh\n").unwrap();
        dir
    }

    #[test]
    fn only_pre_deploy_aborts() {
        assert!(HookPoint::PreDeploy.aborts_workflow());
        assert!(!HookPoint::PostDeploy.aborts_workflow());
        assert!(!HookPoint::OnError.aborts_workflow());
        assert!(!HookPoint::PostRollback.aborts_workflow());
    }

    #[test]
    fn env_skips_unknown_values() {
        let vars = HookEnv::new("acme", "rollback").vars();
        assert_eq!(
            vars,
            vec![
                ("CUTOVER_PROJECT", "acme".to_string()),
                ("CUTOVER_COMMAND", "rollback".to_string()),
            ]
        );
    }

    #[test]
    fn env_includes_color_and_versions() {
        let env = HookEnv {
            version: Some("1.3.0".to_string()),
            color: Some(Color::Green),
            previous_version: Some("1.2.0".to_string()),
            ..HookEnv::new("acme", "deploy 1.3.0")
        };
        let vars = env.vars();
        assert!(vars.contains(&("CUTOVER_COLOR", "green".to_string())));
        assert!(vars.contains(&("CUTOVER_PREVIOUS_VERSION", "1.2.0".to_string())));
        assert_eq!(vars.len(), 5);
    }

    #[tokio::test]
    async fn missing_script_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = Hooks::with_runner(dir.path(), RecordingRunner::new());
        let outcome = hooks
            .fire(HookPoint::PostDeploy, &HookEnv::new("acme", "deploy"))
            .await;
        assert_eq!(outcome, HookOutcome::Absent);
    }

    #[tokio::test]
    async fn script_runs_with_env_and_timeout() {
        let dir = hooks_dir_with("post-deploy");
        let hooks = Hooks::with_runner(dir.path(), RecordingRunner::new())
            .with_timeout(Duration::from_secs(5));

        let outcome = hooks
            .fire(HookPoint::PostDeploy, &HookEnv::new("acme", "deploy"))
            .await;
        assert_eq!(outcome, HookOutcome::Passed);

        let calls = hooks.runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].program.ends_with("hooks/post-deploy"));
        assert_eq!(calls[0].env.get("CUTOVER_PROJECT").map(String::as_str), Some("acme"));
        assert_eq!(calls[0].timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = hooks_dir_with("pre-deploy");
        let runner = RecordingRunner::new();
        runner.respond("", CommandOutput::failed(2, "migrations pending\n"));
        let hooks = Hooks::with_runner(dir.path(), runner);

        let outcome = hooks
            .fire(HookPoint::PreDeploy, &HookEnv::new("acme", "deploy"))
            .await;
        assert_eq!(outcome, HookOutcome::Failed("migrations pending".to_string()));
    }
}
