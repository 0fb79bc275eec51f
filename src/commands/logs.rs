// ABOUTME: Logs command implementation.
// ABOUTME: Resolves the container for a service and streams its logs.

use super::load;
use super::runtime_connection::connect_to_runtime;
use cutover::deploy::{DeployError, Orchestrator};
use cutover::error::Result;
use cutover::output::{Output, OutputMode};
use cutover::runtime::LogOptions;
use cutover::types::{Color, ServiceKind};
use std::path::PathBuf;

pub struct LogsArgs {
    pub service: String,
    pub color: Option<String>,
    pub follow: bool,
    pub since: Option<String>,
    pub tail: Option<u64>,
    pub dir: Option<PathBuf>,
}

pub async fn logs(args: LogsArgs) -> Result<()> {
    let service = ServiceKind::parse(&args.service).map_err(DeployError::from)?;
    let color = args
        .color
        .as_deref()
        .map(str::parse::<Color>)
        .transpose()
        .map_err(DeployError::from)?;

    let (deploy_dir, config) = load(args.dir.as_deref())?;
    let quiet = Output::new(OutputMode::Quiet);
    let runtime = connect_to_runtime(&config, &quiet).await?;

    let options = LogOptions {
        follow: args.follow,
        tail: args.tail,
        since: args.since,
    };
    Orchestrator::new(&runtime, config, deploy_dir)
        .logs(service, color, &options)
        .await
}
