// ABOUTME: Shared helper for connecting to the local container runtime.
// ABOUTME: Eliminates duplication across the commands that drive containers.

use cutover::config::Config;
use cutover::error::Result;
use cutover::output::Output;
use cutover::runtime::{CliRuntime, RuntimeError, TokioCommandRunner, detect_runtime};

pub type LocalRuntime = CliRuntime<TokioCommandRunner>;

/// Detect docker or podman (honouring the configured override) and wrap it.
pub async fn connect_to_runtime(config: &Config, output: &Output) -> Result<LocalRuntime> {
    let runner = TokioCommandRunner;
    let info = detect_runtime(&runner, config.runtime)
        .await
        .map_err(RuntimeError::from)?;

    match &info.version {
        Some(version) => output.progress(&format!("Using {} {}", info.runtime_type, version)),
        None => output.progress(&format!("Using {}", info.runtime_type)),
    }

    Ok(CliRuntime::new(runner, info.runtime_type).with_command_timeout(config.command_timeout))
}
