// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployment.
// ABOUTME: Collects warnings that shouldn't fail a workflow but should be shown to users.

use parking_lot::Mutex;
use serde::Serialize;

/// Collects non-fatal warnings during deployment operations.
///
/// Shared by reference through a whole workflow, including the future run
/// under the deploy lock, so recording only needs `&self`.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Mutex<Vec<Warning>>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.lock().push(warning);
    }

    /// Snapshot of all collected warnings.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    /// Drain collected warnings, leaving the accumulator empty.
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock())
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.lock().is_empty()
    }

    pub fn has_kind(&self, kind: WarningKind) -> bool {
        self.warnings.lock().iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a lock release warning.
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockRelease, message)
    }

    pub fn stale_lock_reclaimed(message: impl Into<String>) -> Self {
        Self::new(WarningKind::StaleLockReclaimed, message)
    }

    /// Old-color container could not be stopped or removed.
    pub fn decommission(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Decommission, message)
    }

    pub fn state_file(message: impl Into<String>) -> Self {
        Self::new(WarningKind::StateFile, message)
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self::new(WarningKind::History, message)
    }

    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Hook, message)
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Interrupted, message)
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Failed to release deploy lock (lock file may remain).
    LockRelease,
    /// A lock left by a dead process was removed.
    StaleLockReclaimed,
    /// Failed to stop or remove a container after traffic moved away from it.
    Decommission,
    /// A state file held unexpected contents.
    StateFile,
    /// The previous-version history could not be recorded.
    History,
    /// A non-fatal lifecycle hook failed.
    Hook,
    /// The operator interrupted a workflow after the point of no return.
    Interrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let diag = Diagnostics::default();

        diag.warn(Warning::lock_release("failed to remove lock file"));
        diag.warn(Warning::decommission("failed to stop acme-rag-blue"));

        assert!(diag.has_warnings());
        assert!(diag.has_kind(WarningKind::Decommission));
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn take_drains_warnings() {
        let diag = Diagnostics::default();
        diag.warn(Warning::hook("post-deploy hook failed"));

        let taken = diag.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].kind, WarningKind::Hook);
        assert!(!diag.has_warnings());
    }
}
