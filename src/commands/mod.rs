// ABOUTME: Command module aggregator for the cutover CLI.
// ABOUTME: Re-exports one handler per subcommand plus shared setup helpers.

mod deploy;
mod logs;
mod maintenance;
mod rollback;
mod runtime_connection;
mod status;

pub use deploy::{DeployArgs, deploy};
pub use logs::{LogsArgs, logs};
pub use maintenance::{cleanup, reset};
pub use rollback::rollback;
pub use status::status;

use cutover::config::{Config, resolve_deploy_dir};
use cutover::diagnostics::Diagnostics;
use cutover::error::Result;
use cutover::output::Output;
use std::path::{Path, PathBuf};

/// Resolve the deploy directory and load its configuration.
fn load(dir: Option<&Path>) -> Result<(PathBuf, Config)> {
    let deploy_dir = resolve_deploy_dir(dir)?;
    let config = Config::load(&deploy_dir)?;
    tracing::debug!(dir = %deploy_dir.display(), project = %config.project, "loaded configuration");
    Ok((deploy_dir, config))
}

/// Print warnings collected during a workflow.
fn emit_warnings(diag: &Diagnostics, output: &Output) {
    for warning in diag.take() {
        output.warning(&warning.message);
    }
}
