// ABOUTME: Best-effort stop and removal of containers that no longer receive traffic.
// ABOUTME: Missing containers are skipped so repeated runs make no runtime calls.

use std::time::Duration;

use crate::runtime::{ContainerError, ContainerOps};

/// Outcome of decommissioning a set of containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
    /// Containers stopped and removed.
    pub removed: Vec<String>,
    /// Containers that did not exist.
    pub skipped: Vec<String>,
    pub failed: Vec<CleanupFailure>,
}

impl CleanupResult {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub container: String,
    pub error: String,
}

/// Stop then remove each container. Failures are collected, never returned.
pub async fn decommission<R: ContainerOps + ?Sized>(
    runtime: &R,
    containers: &[String],
    stop_timeout: Duration,
) -> CleanupResult {
    let mut result = CleanupResult::default();

    for name in containers {
        match runtime.container_exists(name).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(container = %name, "already gone");
                result.skipped.push(name.clone());
                continue;
            }
            Err(e) => {
                result.failed.push(CleanupFailure {
                    container: name.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        }

        // A failed stop still gets a forced remove.
        if let Err(e) = runtime.stop_container(name, stop_timeout).await
            && !matches!(e, ContainerError::NotFound(_))
        {
            tracing::debug!(container = %name, error = %e, "stop failed, forcing removal");
        }

        match runtime.remove_container(name).await {
            Ok(()) | Err(ContainerError::NotFound(_)) => {
                tracing::info!(container = %name, "removed");
                result.removed.push(name.clone());
            }
            Err(e) => result.failed.push(CleanupFailure {
                container: name.clone(),
                error: e.to_string(),
            }),
        }
    }

    result
}
