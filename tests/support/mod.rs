// ABOUTME: Test support utilities.
// ABOUTME: Provides an in-memory FakeRuntime, a test config, and tracing setup.

// Each test binary only uses some of these helpers, so allow dead_code.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use cutover::config::Config;
use cutover::deploy::{DeployErrorKind, Orchestrator};
use cutover::error::Error;
use cutover::output::{Output, OutputMode};
use cutover::runtime::{
    ComposeError, ComposeOps, ComposeRequest, ContainerError, ContainerOps, HealthState,
    ImageError, ImageOps, LogOptions,
};
use cutover::types::ImageRef;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("cutover=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Config with fast health polling and no drain delay.
pub fn test_config() -> Config {
    Config::from_yaml(
        r#"
project: acme
registry: ghcr.io/acme
drain: 0s
health:
  timeout: 300ms
  interval: 10ms
stop:
  timeout: 1s
services:
  db:
    image: postgres:16
  graph-db:
    image: neo4j:5
  proxy:
    image: caddy:2
"#,
    )
    .unwrap()
}

pub fn orchestrator<'a>(runtime: &'a FakeRuntime, dir: &Path) -> Orchestrator<'a, FakeRuntime> {
    orchestrator_with(runtime, dir, test_config())
}

pub fn orchestrator_with<'a>(
    runtime: &'a FakeRuntime,
    dir: &Path,
    config: Config,
) -> Orchestrator<'a, FakeRuntime> {
    init_tracing();
    Orchestrator::new(runtime, config, dir).with_output(Output::new(OutputMode::Quiet))
}

/// Answer every request with the given status line. Returns `http://addr/health`.
pub async fn serve_health(status: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}/health", addr)
}

/// The workflow error kind, if the error came from a workflow.
pub fn deploy_kind(err: &Error) -> Option<DeployErrorKind> {
    match err {
        Error::Deploy(e) => Some(e.kind()),
        _ => None,
    }
}

pub fn read_state(dir: &Path, file: &str) -> Option<String> {
    std::fs::read_to_string(dir.join(file))
        .ok()
        .map(|s| s.trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContainer {
    pub running: bool,
    pub health: HealthState,
    pub version: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    mutations: Vec<String>,
    containers: BTreeMap<String, FakeContainer>,
    failing_pulls: Vec<String>,
    failing_compose: bool,
    unhealthy: Vec<String>,
    failing_removals: Vec<String>,
}

/// In-memory runtime. Compose up creates the containers named in the
/// compose document; mutating calls and log streams are recorded.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    inner: Mutex<Inner>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulls of images containing `fragment` fail.
    pub fn fail_pull(&self, fragment: &str) {
        self.inner.lock().failing_pulls.push(fragment.to_string());
    }

    pub fn fail_compose_up(&self) {
        self.inner.lock().failing_compose = true;
    }

    /// The named container reports unhealthy once started.
    pub fn unhealthy(&self, container: &str) {
        self.inner.lock().unhealthy.push(container.to_string());
    }

    /// Flip an existing container to unhealthy.
    pub fn unhealthy_now(&self, container: &str) {
        if let Some(c) = self.inner.lock().containers.get_mut(container) {
            c.health = HealthState::Unhealthy;
        }
    }

    pub fn fail_remove(&self, container: &str) {
        self.inner.lock().failing_removals.push(container.to_string());
    }

    /// Seed a running, healthy container.
    pub fn add_container(&self, name: &str, version: Option<&str>) {
        self.inner.lock().containers.insert(
            name.to_string(),
            FakeContainer {
                running: true,
                health: HealthState::Healthy,
                version: version.map(str::to_string),
            },
        );
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.inner.lock().containers.get(name).cloned()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.inner.lock().containers.keys().cloned().collect()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.inner.lock().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.inner.lock().mutations.clear();
    }

    fn record(&self, call: String) {
        self.inner.lock().mutations.push(call);
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image = reference.to_string();
        self.record(format!("pull {}", image));
        let inner = self.inner.lock();
        if inner.failing_pulls.iter().any(|f| image.contains(f.as_str())) {
            return Err(ImageError::NotFound(image));
        }
        Ok(())
    }
}

#[async_trait]
impl ComposeOps for FakeRuntime {
    async fn compose_up(&self, request: &ComposeRequest) -> Result<(), ComposeError> {
        self.record(format!("compose-up {}", request.services.join(",")));
        let mut inner = self.inner.lock();
        if inner.failing_compose {
            return Err(ComposeError::UpFailed("scripted failure".to_string()));
        }

        let doc: serde_yaml::Value = serde_yaml::from_str(&request.file)
            .map_err(|e| ComposeError::Runtime(e.to_string()))?;
        for key in &request.services {
            let service = &doc["services"][key.as_str()];
            let name = service["container_name"]
                .as_str()
                .ok_or_else(|| ComposeError::Runtime(format!("{} has no container_name", key)))?
                .to_string();
            let version = service["labels"]["cutover.version"]
                .as_str()
                .map(str::to_string);
            let health = if inner.unhealthy.contains(&name) {
                HealthState::Unhealthy
            } else {
                HealthState::Healthy
            };
            inner.containers.insert(
                name,
                FakeContainer {
                    running: true,
                    health,
                    version,
                },
            );
        }
        Ok(())
    }

    async fn ensure_network(&self, name: &str, _project: &str) -> Result<(), ComposeError> {
        self.record(format!("ensure-network {}", name));
        Ok(())
    }

    async fn ensure_volume(&self, name: &str, _project: &str) -> Result<(), ComposeError> {
        self.record(format!("ensure-volume {}", name));
        Ok(())
    }

    async fn prune_networks(&self, project: &str) -> Result<(), ComposeError> {
        self.record(format!("prune-networks {}", project));
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn stop_container(&self, name: &str, _timeout: Duration) -> Result<(), ContainerError> {
        self.record(format!("stop {}", name));
        match self.inner.lock().containers.get_mut(name) {
            Some(container) => {
                container.running = false;
                Ok(())
            }
            None => Err(ContainerError::NotFound(name.to_string())),
        }
    }

    async fn remove_container(&self, name: &str) -> Result<(), ContainerError> {
        self.record(format!("rm {}", name));
        let mut inner = self.inner.lock();
        if inner.failing_removals.iter().any(|n| n == name) {
            return Err(ContainerError::Runtime(format!("{}: device busy", name)));
        }
        match inner.containers.remove(name) {
            Some(_) => Ok(()),
            None => Err(ContainerError::NotFound(name.to_string())),
        }
    }

    async fn container_exists(&self, name: &str) -> Result<bool, ContainerError> {
        Ok(self.inner.lock().containers.contains_key(name))
    }

    async fn inspect_running(&self, name: &str) -> Result<bool, ContainerError> {
        Ok(self
            .inner
            .lock()
            .containers
            .get(name)
            .is_some_and(|c| c.running))
    }

    async fn inspect_health(&self, name: &str) -> Result<HealthState, ContainerError> {
        self.inner
            .lock()
            .containers
            .get(name)
            .map(|c| c.health)
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    async fn inspect_version_label(&self, name: &str) -> Result<Option<String>, ContainerError> {
        Ok(self
            .inner
            .lock()
            .containers
            .get(name)
            .and_then(|c| c.version.clone()))
    }

    async fn stream_logs(&self, name: &str, _opts: &LogOptions) -> Result<(), ContainerError> {
        self.record(format!("logs {}", name));
        if self.inner.lock().containers.contains_key(name) {
            Ok(())
        } else {
            Err(ContainerError::NotFound(name.to_string()))
        }
    }
}
