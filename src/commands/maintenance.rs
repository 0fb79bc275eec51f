// ABOUTME: Cleanup and reset command implementations.
// ABOUTME: Reset asks for confirmation on stdin unless --force is given.

use super::runtime_connection::connect_to_runtime;
use super::{emit_warnings, load};
use cutover::deploy::{CleanupOutcome, Confirm, Orchestrator, ResetOutcome, ResetRequest};
use cutover::error::Result;
use cutover::output::Output;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// `[y/N]` prompt on stderr, answered on stdin.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

pub async fn cleanup(dir: Option<PathBuf>, mut output: Output) -> Result<()> {
    let (deploy_dir, config) = load(dir.as_deref())?;
    output.start_timer();
    let runtime = connect_to_runtime(&config, &output).await?;
    let orchestrator = Orchestrator::new(&runtime, config, deploy_dir).with_output(output);

    let result = orchestrator.cleanup().await;
    emit_warnings(orchestrator.diagnostics(), orchestrator.output());

    match result? {
        CleanupOutcome::NoActiveDeployment => {
            orchestrator.output().success("Nothing to clean up");
        }
        CleanupOutcome::Cleaned { color, result } => {
            orchestrator.output().success(&format!(
                "Removed {} {} container(s), {} already gone",
                result.removed.len(),
                color,
                result.skipped.len()
            ));
        }
    }
    Ok(())
}

pub async fn reset(
    force: bool,
    all: bool,
    dry_run: bool,
    dir: Option<PathBuf>,
    mut output: Output,
) -> Result<()> {
    let (deploy_dir, config) = load(dir.as_deref())?;
    output.start_timer();
    let runtime = connect_to_runtime(&config, &output).await?;
    let orchestrator = Orchestrator::new(&runtime, config, deploy_dir).with_output(output);

    let request = ResetRequest {
        force,
        all,
        dry_run,
    };
    let result = orchestrator.reset(request, &StdinConfirm).await;
    emit_warnings(orchestrator.diagnostics(), orchestrator.output());

    match result? {
        ResetOutcome::Cancelled => orchestrator.output().success("Reset cancelled"),
        ResetOutcome::Reset { dry_run: true, .. } => orchestrator
            .output()
            .success("Dry run complete; nothing was changed."),
        ResetOutcome::Reset { result, .. } => orchestrator.output().success(&format!(
            "Reset complete: removed {} container(s)",
            result.removed.len()
        )),
    }
    Ok(())
}
