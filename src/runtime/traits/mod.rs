// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ImageOps, ComposeOps, ContainerOps and the FullRuntime bundle.

mod compose;
mod container;
mod image;
mod shared_types;

pub use compose::{ComposeError, ComposeOps, ComposeRequest};
pub use container::{ContainerError, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use shared_types::*;

/// Everything the orchestrator needs from a runtime.
pub trait FullRuntime: ImageOps + ComposeOps + ContainerOps {}

impl<T: ImageOps + ComposeOps + ContainerOps> FullRuntime for T {}
