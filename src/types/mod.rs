// ABOUTME: Validated domain types for the blue-green orchestrator.
// ABOUTME: Colors, service kinds, release versions, and image references.

mod color;
mod image_ref;
mod service_name;
mod version;

pub use color::{Color, ColorError};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use service_name::{RotatableService, ServiceKind, ServiceNameError, StatefulService};
pub use version::{Version, VersionError};
