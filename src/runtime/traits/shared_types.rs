// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: Health states, log options, and the label keys stamped on managed containers.

/// Marks containers created by cutover.
pub const LABEL_MANAGED: &str = "cutover.managed";
pub const LABEL_PROJECT: &str = "cutover.project";
pub const LABEL_SERVICE: &str = "cutover.service";
pub const LABEL_COLOR: &str = "cutover.color";
/// Release version a container was started from.
pub const LABEL_VERSION: &str = "cutover.version";

/// Health state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Healthy,
    Unhealthy,
    /// No healthcheck configured.
    None,
}

impl HealthState {
    /// Parse the runtime's `.State.Health.Status` value.
    pub fn from_status(status: &str) -> Self {
        match status.trim() {
            "healthy" => HealthState::Healthy,
            "unhealthy" => HealthState::Unhealthy,
            "starting" => HealthState::Starting,
            _ => HealthState::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Starting => "starting",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
            HealthState::None => "none",
        }
    }
}

/// Options for log streaming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Follow log output (like `tail -f`).
    pub follow: bool,
    /// Number of lines to show from the end.
    pub tail: Option<u64>,
    /// Show logs since this time; passed through to the runtime
    /// (RFC 3339 timestamp or relative duration such as `10m`).
    pub since: Option<String>,
}
