// ABOUTME: Blue-green deployment workflows using the type state pattern.
// ABOUTME: Exports the lock, the state store, rollout states, and the orchestrator.

mod decommission;
mod error;
mod lock;
mod orchestrator;
mod rollout;
mod state;
mod status;
mod store;
mod transitions;

pub use decommission::{CleanupFailure, CleanupResult, decommission};
pub use error::{DeployError, DeployErrorKind, LockHolderInfo};
pub use lock::{DeployLock, LOCK_FILE, LockInfo, process_alive};
pub use orchestrator::{
    CleanupOutcome, Confirm, DeployRequest, DeploySummary, Orchestrator, ResetOutcome,
    ResetRequest, RollbackRequest, RollbackSummary,
};
pub use rollout::Rollout;
pub use state::{Completed, ImagesPulled, Planned, SlotHealthy, SlotStarted, Switched};
pub use status::{LockStatus, ServiceStatus, SlotStatus, StatusReport, collect_status};
pub use store::{COLOR_FILE, DeploymentState, PREVIOUS_VERSION_FILE, StateStore};
