// ABOUTME: Deploy command implementation.
// ABOUTME: Parses the release and service list, then runs the deploy workflow.

use super::runtime_connection::connect_to_runtime;
use super::{emit_warnings, load};
use cutover::deploy::{DeployError, DeployRequest, Orchestrator};
use cutover::error::Result;
use cutover::output::Output;
use cutover::types::{ServiceKind, Version};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub struct DeployArgs {
    pub version: String,
    pub all: bool,
    pub services: Option<String>,
    pub dry_run: bool,
    pub host: Option<String>,
    pub dir: Option<PathBuf>,
}

pub async fn deploy(args: DeployArgs, mut output: Output, cancel: CancellationToken) -> Result<()> {
    let version = Version::new(&args.version).map_err(DeployError::from)?;
    let services = args
        .services
        .as_deref()
        .map(ServiceKind::parse_list)
        .transpose()
        .map_err(DeployError::from)?;

    let (deploy_dir, config) = load(args.dir.as_deref())?;
    output.start_timer();
    let runtime = connect_to_runtime(&config, &output).await?;

    let orchestrator = Orchestrator::new(&runtime, config, deploy_dir)
        .with_output(output)
        .with_cancel(cancel);
    let request = DeployRequest {
        services,
        all: args.all,
        dry_run: args.dry_run,
        host: args.host,
        ..DeployRequest::new(version)
    };

    let result = orchestrator.deploy(&request).await;
    emit_warnings(orchestrator.diagnostics(), orchestrator.output());
    let summary = result?;

    let output = orchestrator.output();
    if summary.dry_run {
        output.success("Dry run complete; nothing was changed.");
    } else if summary.in_place {
        output.success(&format!(
            "Updated {} in place in {}",
            summary.version, summary.color
        ));
    } else {
        output.success(&format!(
            "Deployed {} to {}; traffic switched",
            summary.version, summary.color
        ));
    }
    Ok(())
}
