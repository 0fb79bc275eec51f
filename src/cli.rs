// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cutover")]
#[command(about = "Blue-green deployments for Docker and Podman compose stacks")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct DirArg {
    /// Deploy directory holding the lock, state files, hooks, and cutover.yml
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a release into the inactive color and switch traffic to it
    Deploy {
        /// Release version (image tag)
        version: String,

        /// Also (re)start the stateful services
        #[arg(long, conflicts_with = "services")]
        all: bool,

        /// Update only these services in the active color (comma-separated)
        #[arg(long, value_name = "SVC,...")]
        services: Option<String>,

        /// Show what would happen without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Public hostname routed by the proxy
        #[arg(long)]
        host: Option<String>,

        #[command(flatten)]
        dir: DirArg,
    },

    /// Switch traffic back to the previous release
    Rollback {
        /// Roll back to this version instead of the recorded previous one
        #[arg(long)]
        version: Option<String>,

        #[command(flatten)]
        dir: DirArg,
    },

    /// Show the lock, active color, and container status
    Status {
        #[command(flatten)]
        dir: DirArg,
    },

    /// Remove the inactive color's containers
    Cleanup {
        #[command(flatten)]
        dir: DirArg,
    },

    /// Remove all blue and green containers and forget deployment state
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,

        /// Also remove stateful containers (data volumes are kept)
        #[arg(long)]
        all: bool,

        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        dir: DirArg,
    },

    /// Stream a service's container logs
    Logs {
        /// Service name (e.g. platform, db)
        service: String,

        /// Color slot for rotatable services; defaults to the active one
        #[arg(long)]
        color: Option<String>,

        /// Follow log output
        #[arg(short, long)]
        follow: bool,

        /// Show logs since a timestamp or relative duration (e.g. 10m)
        #[arg(long)]
        since: Option<String>,

        /// Number of lines to show from the end
        #[arg(short = 'n', long)]
        tail: Option<u64>,

        #[command(flatten)]
        dir: DirArg,
    },
}
