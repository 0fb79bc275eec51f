// ABOUTME: Compose operations trait for container runtimes.
// ABOUTME: Bring up a subset of compose services and manage shared networks and volumes.

use async_trait::async_trait;

/// A compose invocation: project name, generated file, services to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub project: String,
    /// Compose file contents, fed to the runtime on stdin.
    pub file: String,
    /// Compose service keys to bring up; dependencies are not started.
    pub services: Vec<String>,
}

#[async_trait]
pub trait ComposeOps: Send + Sync {
    /// Start (or recreate) the named services detached.
    async fn compose_up(&self, request: &ComposeRequest) -> Result<(), ComposeError>;

    /// Create the network unless it already exists.
    async fn ensure_network(&self, name: &str, project: &str) -> Result<(), ComposeError>;

    /// Create the named volume unless it already exists.
    async fn ensure_volume(&self, name: &str, project: &str) -> Result<(), ComposeError>;

    /// Remove unused networks created for the project.
    async fn prune_networks(&self, project: &str) -> Result<(), ComposeError>;
}

/// Errors from compose and resource operations.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("compose up failed: {0}")]
    UpFailed(String),

    #[error("network operation failed: {0}")]
    Network(String),

    #[error("volume operation failed: {0}")]
    Volume(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
