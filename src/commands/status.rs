// ABOUTME: Status command implementation.
// ABOUTME: Reports lock, state, and containers without taking the lock, even with a broken config.

use super::runtime_connection::{LocalRuntime, connect_to_runtime};
use cutover::config::{Config, resolve_deploy_dir};
use cutover::deploy::{Orchestrator, collect_status};
use cutover::diagnostics::Diagnostics;
use cutover::error::Result;
use cutover::output::{Output, OutputMode};
use std::path::PathBuf;

pub async fn status(dir: Option<PathBuf>, output: Output) -> Result<()> {
    let deploy_dir = resolve_deploy_dir(dir.as_deref())?;

    // State files and the lock are still worth showing when cutover.yml is unusable.
    let mut config_problem = None;
    let config = Config::load(&deploy_dir).unwrap_or_else(|e| {
        config_problem = Some(format!("ignoring configuration ({}); using defaults", e));
        Config::default()
    });

    // Progress from runtime detection would interleave with the report.
    let quiet = Output::new(OutputMode::Quiet);
    let runtime = match connect_to_runtime(&config, &quiet).await {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            tracing::debug!("container runtime unavailable: {}", e);
            None
        }
    };

    let (report, warnings) = match &runtime {
        Some(runtime) => {
            let orch = Orchestrator::new(runtime, config, deploy_dir).with_output(quiet);
            let report = orch.status().await?;
            (report, orch.diagnostics().take())
        }
        None => {
            let diag = Diagnostics::default();
            let report = collect_status::<LocalRuntime>(&deploy_dir, &config, None, &diag).await?;
            (report, diag.take())
        }
    };

    output.document(&report.render(), &report);
    if let Some(problem) = config_problem {
        output.warning(&problem);
    }
    for warning in warnings {
        output.warning(&warning.message);
    }
    Ok(())
}
