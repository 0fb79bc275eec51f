// ABOUTME: Runtime detection by probing the Docker and Podman CLIs.
// ABOUTME: Honors an explicit runtime from configuration before probing.

use super::command::{CommandError, CommandRunner, CommandSpec};
use super::types::{RuntimeInfo, RuntimeType};
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked docker and podman)")]
    NoRuntimeFound,

    #[error("{0}")]
    Command(CommandError),
}

/// Detect the container runtime available on this host.
///
/// Detection order (when not explicitly configured):
/// 1. `docker version`
/// 2. `podman version`
///
/// An explicit runtime must still answer its version probe.
pub async fn detect_runtime<R: CommandRunner + ?Sized>(
    runner: &R,
    explicit: Option<RuntimeType>,
) -> Result<RuntimeInfo, DetectionError> {
    let candidates: &[RuntimeType] = match explicit {
        Some(ref runtime) => std::slice::from_ref(runtime),
        None => &[RuntimeType::Docker, RuntimeType::Podman],
    };

    for runtime in candidates {
        if let Some(version) = probe(runner, *runtime).await? {
            tracing::debug!(runtime = %runtime, version = ?version, "detected container runtime");
            return Ok(RuntimeInfo {
                runtime_type: *runtime,
                version,
            });
        }
    }

    Err(DetectionError::NoRuntimeFound)
}

/// `Some(version)` when the runtime answered, `None` when it is absent.
async fn probe<R: CommandRunner + ?Sized>(
    runner: &R,
    runtime: RuntimeType,
) -> Result<Option<Option<String>>, DetectionError> {
    let spec = CommandSpec::new(runtime.program())
        .args(["version", "--format", "{{.Server.Version}}"])
        .timeout(PROBE_TIMEOUT);

    match runner.run(&spec).await {
        Ok(output) if output.success() => {
            let version = output.stdout.trim();
            Ok(Some((!version.is_empty()).then(|| version.to_string())))
        }
        Ok(_) => Ok(None),
        // Binary not installed.
        Err(CommandError::Spawn { .. }) => Ok(None),
        Err(e) => Err(DetectionError::Command(e)),
    }
}
