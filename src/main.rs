// ABOUTME: Entry point for the cutover CLI application.
// ABOUTME: Parses arguments, installs logging and Ctrl-C handling, and maps errors to exit codes.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{DeployArgs, LogsArgs};
use cutover::error::Result;
use cutover::output::{Output, OutputMode};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping at the next safe point");
            on_signal.cancel();
        }
    });

    if let Err(e) = run(cli.command, mode, cancel).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, mode: OutputMode, cancel: CancellationToken) -> Result<()> {
    let output = Output::new(mode);
    match command {
        Commands::Deploy {
            version,
            all,
            services,
            dry_run,
            host,
            dir,
        } => {
            let args = DeployArgs {
                version,
                all,
                services,
                dry_run,
                host,
                dir: dir.dir,
            };
            commands::deploy(args, output, cancel).await
        }
        Commands::Rollback { version, dir } => {
            commands::rollback(version, dir.dir, output, cancel).await
        }
        Commands::Status { dir } => commands::status(dir.dir, output).await,
        Commands::Cleanup { dir } => commands::cleanup(dir.dir, output).await,
        Commands::Reset {
            force,
            all,
            dry_run,
            dir,
        } => commands::reset(force, all, dry_run, dir.dir, output).await,
        Commands::Logs {
            service,
            color,
            follow,
            since,
            tail,
            dir,
        } => {
            commands::logs(LogsArgs {
                service,
                color,
                follow,
                since,
                tail,
                dir: dir.dir,
            })
            .await
        }
    }
}
