// ABOUTME: Container runtime adapter for Docker and Podman.
// ABOUTME: Detects the runtime and drives it through its CLI behind capability traits.

mod cli;
mod command;
mod detection;
mod error;
pub mod traits;
mod types;

pub use cli::CliRuntime;
pub use command::{
    CommandError, CommandOutput, CommandRunner, CommandSpec, RecordingRunner, TokioCommandRunner,
};
pub use detection::{DetectionError, detect_runtime};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::{
    ComposeError, ComposeOps, ComposeRequest, ContainerError, ContainerOps, FullRuntime,
    HealthState, ImageError, ImageOps, LogOptions,
};
pub use types::{RuntimeInfo, RuntimeType};
