// ABOUTME: Rollback command implementation.
// ABOUTME: Redeploys the previous release into the inactive color and switches back.

use super::runtime_connection::connect_to_runtime;
use super::{emit_warnings, load};
use cutover::deploy::{DeployError, Orchestrator, RollbackRequest};
use cutover::error::Result;
use cutover::output::Output;
use cutover::types::Version;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub async fn rollback(
    version: Option<String>,
    dir: Option<PathBuf>,
    mut output: Output,
    cancel: CancellationToken,
) -> Result<()> {
    let version = version
        .as_deref()
        .map(Version::new)
        .transpose()
        .map_err(DeployError::from)?;

    let (deploy_dir, config) = load(dir.as_deref())?;
    output.start_timer();
    let runtime = connect_to_runtime(&config, &output).await?;

    let orchestrator = Orchestrator::new(&runtime, config, deploy_dir)
        .with_output(output)
        .with_cancel(cancel);

    let result = orchestrator.rollback(&RollbackRequest { version }).await;
    emit_warnings(orchestrator.diagnostics(), orchestrator.output());
    let summary = result?;

    orchestrator.output().success(&format!(
        "Rolled back to {} in {}; {} is no longer active",
        summary.version, summary.color, summary.replaced
    ));
    Ok(())
}
