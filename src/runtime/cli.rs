// ABOUTME: CliRuntime implements the capability traits by shelling out to docker or podman.
// ABOUTME: Compose files are piped over stdin; inspect output is parsed from Go templates.

use super::command::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use super::traits::{
    ComposeError, ComposeOps, ComposeRequest, ContainerError, ContainerOps, HealthState,
    ImageError, ImageOps, LABEL_PROJECT, LABEL_VERSION, LogOptions,
};
use super::types::RuntimeType;
use crate::types::ImageRef;
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Runtime adapter driving the docker/podman CLI through a [`CommandRunner`].
#[derive(Debug)]
pub struct CliRuntime<R> {
    runner: R,
    runtime: RuntimeType,
    command_timeout: Duration,
}

impl<R: CommandRunner> CliRuntime<R> {
    pub fn new(runner: R, runtime: RuntimeType) -> Self {
        Self {
            runner,
            runtime,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Upper bound for any single CLI invocation.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(self.runtime.program())
            .args(args)
            .timeout(self.command_timeout)
    }

    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, CommandError> {
        self.runner.run(&spec).await
    }

    /// `inspect --type <kind> --format <template> <name>`.
    async fn inspect(
        &self,
        kind: &str,
        template: &str,
        name: &str,
    ) -> Result<CommandOutput, CommandError> {
        self.run(self.command(["inspect", "--type", kind, "--format", template, name]))
            .await
    }

    async fn inspect_container(
        &self,
        template: &str,
        name: &str,
    ) -> Result<Option<String>, ContainerError> {
        let output = self
            .inspect("container", template, name)
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;
        if output.success() {
            return Ok(Some(output.stdout.trim().to_string()));
        }
        match ContainerError::from_output(name, &output.failure_message()) {
            ContainerError::NotFound(_) => Ok(None),
            err => Err(err),
        }
    }

    async fn resource_exists(&self, kind: &str, name: &str) -> Result<bool, CommandError> {
        let output = self.run(self.command([kind, "inspect", name])).await?;
        Ok(output.success())
    }
}

#[async_trait]
impl<R: CommandRunner> ImageOps for CliRuntime<R> {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image = reference.to_string();
        tracing::debug!(image = %image, "pulling image");

        let output = self
            .run(self.command(["pull", image.as_str()]))
            .await
            .map_err(|e| ImageError::Runtime(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(ImageError::from_pull_output(&image, &output.failure_message()))
        }
    }
}

#[async_trait]
impl<R: CommandRunner> ComposeOps for CliRuntime<R> {
    async fn compose_up(&self, request: &ComposeRequest) -> Result<(), ComposeError> {
        let mut args = vec![
            "compose".to_string(),
            "-p".to_string(),
            request.project.clone(),
            "-f".to_string(),
            "-".to_string(),
            "up".to_string(),
            "-d".to_string(),
            "--no-deps".to_string(),
        ];
        args.extend(request.services.iter().cloned());

        let output = self
            .run(self.command(args).stdin(request.file.clone()))
            .await
            .map_err(|e| ComposeError::Runtime(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(ComposeError::UpFailed(output.failure_message()))
        }
    }

    async fn ensure_network(&self, name: &str, project: &str) -> Result<(), ComposeError> {
        let network_err = |e: CommandError| ComposeError::Network(e.to_string());
        if self.resource_exists("network", name).await.map_err(network_err)? {
            return Ok(());
        }

        let label = format!("{}={}", LABEL_PROJECT, project);
        let output = self
            .run(self.command(["network", "create", "--label", label.as_str(), name]))
            .await
            .map_err(network_err)?;
        // Lost a race with a concurrent creator.
        if output.success() || output.failure_message().contains("already exists") {
            Ok(())
        } else {
            Err(ComposeError::Network(format!(
                "{}: {}",
                name,
                output.failure_message()
            )))
        }
    }

    async fn ensure_volume(&self, name: &str, project: &str) -> Result<(), ComposeError> {
        let volume_err = |e: CommandError| ComposeError::Volume(e.to_string());
        if self.resource_exists("volume", name).await.map_err(volume_err)? {
            return Ok(());
        }

        let label = format!("{}={}", LABEL_PROJECT, project);
        let output = self
            .run(self.command(["volume", "create", "--label", label.as_str(), name]))
            .await
            .map_err(volume_err)?;
        if output.success() || output.failure_message().contains("already exists") {
            Ok(())
        } else {
            Err(ComposeError::Volume(format!(
                "{}: {}",
                name,
                output.failure_message()
            )))
        }
    }

    async fn prune_networks(&self, project: &str) -> Result<(), ComposeError> {
        let filter = format!("label={}={}", LABEL_PROJECT, project);
        let output = self
            .run(self.command(["network", "prune", "-f", "--filter", filter.as_str()]))
            .await
            .map_err(|e| ComposeError::Network(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(ComposeError::Network(output.failure_message()))
        }
    }
}

#[async_trait]
impl<R: CommandRunner> ContainerOps for CliRuntime<R> {
    async fn stop_container(&self, name: &str, timeout: Duration) -> Result<(), ContainerError> {
        let secs = timeout.as_secs().to_string();
        // Leave the runtime room to kill the container after its grace period.
        let spec = self
            .command(["stop", "-t", secs.as_str(), name])
            .timeout(self.command_timeout + timeout);
        let output = self
            .run(spec)
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(ContainerError::from_output(name, &output.failure_message()))
        }
    }

    async fn remove_container(&self, name: &str) -> Result<(), ContainerError> {
        let output = self
            .run(self.command(["rm", "-f", name]))
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(ContainerError::from_output(name, &output.failure_message()))
        }
    }

    async fn container_exists(&self, name: &str) -> Result<bool, ContainerError> {
        Ok(self.inspect_container("{{.Id}}", name).await?.is_some())
    }

    async fn inspect_running(&self, name: &str) -> Result<bool, ContainerError> {
        let running = self.inspect_container("{{.State.Running}}", name).await?;
        Ok(running.as_deref() == Some("true"))
    }

    async fn inspect_health(&self, name: &str) -> Result<HealthState, ContainerError> {
        let template = "{{if .State.Health}}{{.State.Health.Status}}{{else}}none{{end}}";
        self.inspect_container(template, name)
            .await?
            .map(|status| HealthState::from_status(&status))
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    async fn inspect_version_label(&self, name: &str) -> Result<Option<String>, ContainerError> {
        let template = format!("{{{{index .Config.Labels \"{}\"}}}}", LABEL_VERSION);
        let label = self.inspect_container(&template, name).await?;
        Ok(label.filter(|v| !v.is_empty() && v != "<no value>"))
    }

    async fn stream_logs(&self, name: &str, opts: &LogOptions) -> Result<(), ContainerError> {
        let mut args = vec!["logs".to_string()];
        if opts.follow {
            args.push("--follow".to_string());
        }
        if let Some(since) = &opts.since {
            args.push("--since".to_string());
            args.push(since.clone());
        }
        if let Some(tail) = opts.tail {
            args.push("--tail".to_string());
            args.push(tail.to_string());
        }
        args.push(name.to_string());

        // Followed logs run until interrupted, so no timeout here.
        let spec = CommandSpec::new(self.runtime.program()).args(args);
        let code = self
            .runner
            .stream(&spec)
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;
        match code {
            Some(0) => Ok(()),
            Some(code) => Err(ContainerError::Runtime(format!(
                "{}: logs exited with status {}",
                name, code
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::command::RecordingRunner;

    fn runtime() -> CliRuntime<RecordingRunner> {
        CliRuntime::new(RecordingRunner::new(), RuntimeType::Docker)
            .with_command_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn compose_up_pipes_file_and_skips_dependencies() {
        let rt = runtime();
        let request = ComposeRequest {
            project: "acme".to_string(),
            file: "services: {}\n".to_string(),
            services: vec!["rag-green".to_string(), "platform-green".to_string()],
        };
        rt.compose_up(&request).await.unwrap();

        let calls = rt.runner().calls();
        assert_eq!(
            calls[0].command_line(),
            "docker compose -p acme -f - up -d --no-deps rag-green platform-green"
        );
        assert_eq!(calls[0].stdin.as_deref(), Some("services: {}\n"));
    }

    #[tokio::test]
    async fn compose_failure_carries_stderr() {
        let rt = runtime();
        rt.runner()
            .respond("docker compose", CommandOutput::failed(1, "port is already allocated"));
        let request = ComposeRequest {
            project: "acme".to_string(),
            file: String::new(),
            services: vec!["proxy".to_string()],
        };
        let err = rt.compose_up(&request).await.unwrap_err();
        assert!(matches!(err, ComposeError::UpFailed(msg) if msg == "port is already allocated"));
    }

    #[tokio::test]
    async fn ensure_network_skips_create_when_present() {
        let rt = runtime();
        rt.ensure_network("acme-network", "acme").await.unwrap();
        assert_eq!(rt.runner().command_lines(), vec!["docker network inspect acme-network"]);
    }

    #[tokio::test]
    async fn ensure_network_creates_labelled_network() {
        let rt = runtime();
        rt.runner()
            .respond("docker network inspect", CommandOutput::failed(1, "network not found"));
        rt.ensure_network("acme-network", "acme").await.unwrap();
        assert_eq!(
            rt.runner().command_lines()[1],
            "docker network create --label cutover.project=acme acme-network"
        );
    }

    #[tokio::test]
    async fn missing_container_is_not_running() {
        let rt = runtime();
        rt.runner().respond(
            "docker inspect",
            CommandOutput::failed(1, "Error: No such container: acme-rag-blue"),
        );
        assert!(!rt.inspect_running("acme-rag-blue").await.unwrap());
        assert!(!rt.container_exists("acme-rag-blue").await.unwrap());
        assert!(matches!(
            rt.inspect_health("acme-rag-blue").await,
            Err(ContainerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn health_without_healthcheck_is_none() {
        let rt = runtime();
        rt.runner().respond("docker inspect", CommandOutput::ok("none\n"));
        assert_eq!(
            rt.inspect_health("acme-proxy").await.unwrap(),
            HealthState::None
        );
    }

    #[tokio::test]
    async fn version_label_placeholder_is_absent() {
        let rt = runtime();
        rt.runner().respond("docker inspect", CommandOutput::ok("<no value>\n"));
        assert_eq!(rt.inspect_version_label("acme-platform-blue").await.unwrap(), None);

        rt.runner().respond("docker inspect", CommandOutput::ok("1.4.2\n"));
        assert_eq!(
            rt.inspect_version_label("acme-platform-blue").await.unwrap().as_deref(),
            Some("1.4.2")
        );
        assert!(rt.runner().command_lines()[0].contains("index .Config.Labels \"cutover.version\""));
    }

    #[tokio::test]
    async fn stop_passes_grace_period() {
        let rt = CliRuntime::new(RecordingRunner::new(), RuntimeType::Podman);
        rt.stop_container("acme-rag-blue", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(rt.runner().command_lines(), vec!["podman stop -t 30 acme-rag-blue"]);
    }

    #[tokio::test]
    async fn logs_builds_flags() {
        let rt = runtime();
        let opts = LogOptions {
            follow: true,
            tail: Some(100),
            since: Some("10m".to_string()),
        };
        rt.stream_logs("acme-rag-green", &opts).await.unwrap();
        assert_eq!(
            rt.runner().command_lines(),
            vec!["docker logs --follow --since 10m --tail 100 acme-rag-green"]
        );
    }
}
