// ABOUTME: Error types for deployment workflows.
// ABOUTME: Covers lock contention, missing state, image pull, compose, and health gate failures.

use chrono::{DateTime, Utc};

use crate::runtime::{ComposeError, ImageError};
use crate::types::{ColorError, ServiceNameError, VersionError};

/// The process holding a contended deploy lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolderInfo {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub command: String,
    pub hostname: Option<String>,
}

impl std::fmt::Display for LockHolderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` (pid {}", self.command, self.pid)?;
        if let Some(host) = &self.hostname {
            write!(f, " on {}", host)?;
        }
        write!(f, ") since {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// Errors that abort a deployment workflow.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Another live process holds the deploy lock.
    #[error("{}", contention_message(.0.as_ref()))]
    LockContention(Option<LockHolderInfo>),

    #[error("lock file error: {0}")]
    LockIo(String),

    #[error("deployment state error: {0}")]
    StateStore(String),

    #[error("no active deployment (run `cutover deploy <version>` first)")]
    NoActiveDeployment,

    #[error("no previous version recorded; pass --version to choose one")]
    NoPreviousVersion,

    #[error("failed to pull image: {0}")]
    ImagePullFailure(String),

    #[error("compose up failed: {0}")]
    ComposeUpFailure(String),

    #[error("{container} did not become healthy within {timeout_secs}s")]
    HealthCheckTimeout { container: String, timeout_secs: u64 },

    #[error(transparent)]
    InvalidServiceName(#[from] ServiceNameError),

    #[error(transparent)]
    InvalidColor(#[from] ColorError),

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    #[error("infrastructure setup failed: {0}")]
    InfrastructureSetupFailure(String),

    #[error("interrupted before traffic was switched")]
    Interrupted,
}

fn contention_message(holder: Option<&LockHolderInfo>) -> String {
    match holder {
        Some(holder) => format!("another deployment is in progress: {}", holder),
        None => "another deployment is in progress".to_string(),
    }
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    LockContention,
    LockIo,
    StateStore,
    NoActiveDeployment,
    NoPreviousVersion,
    ImagePullFailure,
    ComposeUpFailure,
    HealthCheckTimeout,
    InvalidServiceName,
    InvalidColor,
    InvalidVersion,
    InfrastructureSetupFailure,
    Interrupted,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::LockContention(_) => DeployErrorKind::LockContention,
            DeployError::LockIo(_) => DeployErrorKind::LockIo,
            DeployError::StateStore(_) => DeployErrorKind::StateStore,
            DeployError::NoActiveDeployment => DeployErrorKind::NoActiveDeployment,
            DeployError::NoPreviousVersion => DeployErrorKind::NoPreviousVersion,
            DeployError::ImagePullFailure(_) => DeployErrorKind::ImagePullFailure,
            DeployError::ComposeUpFailure(_) => DeployErrorKind::ComposeUpFailure,
            DeployError::HealthCheckTimeout { .. } => DeployErrorKind::HealthCheckTimeout,
            DeployError::InvalidServiceName(_) => DeployErrorKind::InvalidServiceName,
            DeployError::InvalidColor(_) => DeployErrorKind::InvalidColor,
            DeployError::InvalidVersion(_) => DeployErrorKind::InvalidVersion,
            DeployError::InfrastructureSetupFailure(_) => {
                DeployErrorKind::InfrastructureSetupFailure
            }
            DeployError::Interrupted => DeployErrorKind::Interrupted,
        }
    }

    /// The live lock holder, if this is a contention error and it could be read.
    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            DeployError::LockContention(holder) => holder.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn lock_io(context: &str, err: impl std::fmt::Display) -> Self {
        DeployError::LockIo(format!("{}: {}", context, err))
    }

    pub(crate) fn state_store(context: &str, err: impl std::fmt::Display) -> Self {
        DeployError::StateStore(format!("{}: {}", context, err))
    }
}

impl From<ImageError> for DeployError {
    fn from(err: ImageError) -> Self {
        DeployError::ImagePullFailure(err.to_string())
    }
}

impl From<ComposeError> for DeployError {
    fn from(err: ComposeError) -> Self {
        match err {
            ComposeError::UpFailed(msg) | ComposeError::Runtime(msg) => {
                DeployError::ComposeUpFailure(msg)
            }
            err @ (ComposeError::Network(_) | ComposeError::Volume(_)) => {
                DeployError::InfrastructureSetupFailure(err.to_string())
            }
        }
    }
}
