// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Stop, remove, inspect, and stream logs of named containers.

use super::shared_types::{HealthState, LogOptions};
use async_trait::async_trait;
use std::time::Duration;

/// Container lifecycle and inspection operations, addressed by name.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Stop a running container, killing it after `timeout`.
    async fn stop_container(&self, name: &str, timeout: Duration) -> Result<(), ContainerError>;

    /// Force-remove a container.
    async fn remove_container(&self, name: &str) -> Result<(), ContainerError>;

    async fn container_exists(&self, name: &str) -> Result<bool, ContainerError>;

    /// Whether the container exists and is running. Missing containers are
    /// reported as not running.
    async fn inspect_running(&self, name: &str) -> Result<bool, ContainerError>;

    /// The container's healthcheck state. `HealthState::None` when the image
    /// defines no healthcheck.
    async fn inspect_health(&self, name: &str) -> Result<HealthState, ContainerError>;

    /// The release version label, if the container exists and carries one.
    async fn inspect_version_label(&self, name: &str) -> Result<Option<String>, ContainerError>;

    /// Stream logs to the operator's terminal until the runtime exits.
    async fn stream_logs(&self, name: &str, opts: &LogOptions) -> Result<(), ContainerError>;
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ContainerError {
    /// Map CLI error output, recognising the "no such container" family.
    pub fn from_output(name: &str, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("no such container") || lower.contains("no such object") {
            ContainerError::NotFound(name.to_string())
        } else {
            ContainerError::Runtime(format!("{}: {}", name, message))
        }
    }
}
