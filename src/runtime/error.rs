// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Unifies detection and command failures for programmatic handling.

use snafu::Snafu;

use super::command::CommandError;
use super::detection::DetectionError;

/// Unified runtime error for detection and CLI invocation failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("runtime command failed: {source}"))]
    Command { source: CommandError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// No container runtime found on the system.
    NoRuntimeFound,
    /// The runtime CLI could not be started.
    SpawnFailed,
    /// The runtime CLI did not finish in time.
    TimedOut,
    /// Other I/O failure talking to the CLI.
    Io,
}

impl RuntimeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Detection { source } => match source {
                DetectionError::NoRuntimeFound => RuntimeErrorKind::NoRuntimeFound,
                DetectionError::Command(CommandError::Timeout { .. }) => {
                    RuntimeErrorKind::TimedOut
                }
                DetectionError::Command(_) => RuntimeErrorKind::SpawnFailed,
            },
            RuntimeError::Command { source } => match source {
                CommandError::Spawn { .. } => RuntimeErrorKind::SpawnFailed,
                CommandError::Timeout { .. } => RuntimeErrorKind::TimedOut,
                CommandError::Io(_) => RuntimeErrorKind::Io,
            },
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}

impl From<CommandError> for RuntimeError {
    fn from(source: CommandError) -> Self {
        RuntimeError::Command { source }
    }
}
