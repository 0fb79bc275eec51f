// ABOUTME: Deploy lock preventing concurrent mutating workflows on one deploy directory.
// ABOUTME: Exclusive create via hard link, dead-PID reclamation, release on drop.

use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, Warning};

use super::error::{DeployError, LockHolderInfo};

pub const LOCK_FILE: &str = "deploy.lock";

/// Held while a stale lock is checked and replaced.
const RECLAIM_FILE: &str = "deploy.lock.reclaim";

/// A reclaim guard older than this was left by a crashed process.
const RECLAIM_GUARD_TTL: Duration = Duration::from_secs(10);

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Contents of the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl LockInfo {
    /// Lock info for the current process.
    pub fn new(command: &str) -> Self {
        Self {
            pid: std::process::id(),
            started_at: Utc::now(),
            command: command.to_string(),
            hostname: Some(gethostname::gethostname().to_string_lossy().into_owned()),
        }
    }

    pub fn lock_path(deploy_dir: &Path) -> PathBuf {
        deploy_dir.join(LOCK_FILE)
    }

    /// Read the lock file. `Ok(None)` if there is none; `Err` carries the
    /// parse or I/O failure for unreadable files.
    pub fn read(deploy_dir: &Path) -> Result<Option<Self>, DeployError> {
        let path = Self::lock_path(deploy_dir);
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| DeployError::lock_io("corrupt lock file", e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DeployError::lock_io("failed to read lock file", e)),
        }
    }

    /// Whether the holder is a live OS process.
    pub fn is_alive(&self) -> bool {
        process_alive(self.pid)
    }

    pub fn holder(&self) -> LockHolderInfo {
        LockHolderInfo {
            pid: self.pid,
            started_at: self.started_at,
            command: self.command.clone(),
            hostname: self.hostname.clone(),
        }
    }
}

/// Signal-0 liveness probe. EPERM means the process exists under another user.
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // 0 and values beyond i32 would address process groups, not a process.
    if pid == 0 || pid > i32::MAX as u32 {
        return false;
    }
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// A held deploy lock that releases on drop.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    reclaimed: Option<String>,
    released: bool,
}

impl DeployLock {
    /// Try to take the lock. `Ok(None)` means a live process holds it.
    ///
    /// A lock left by a dead process, or one whose contents cannot be parsed,
    /// is replaced under a reclaim guard, and only if the file still holds the
    /// contents judged stale. Losing the guard or finding the file changed is
    /// contention.
    pub fn try_acquire(deploy_dir: &Path, command: &str) -> Result<Option<Self>, DeployError> {
        fs::create_dir_all(deploy_dir)
            .map_err(|e| DeployError::lock_io("failed to create deploy directory", e))?;

        let path = LockInfo::lock_path(deploy_dir);
        let content = serde_json::to_string_pretty(&LockInfo::new(command))
            .map_err(|e| DeployError::lock_io("failed to serialize lock", e))?;

        if create_exclusive(&path, &content)? {
            tracing::debug!(path = %path.display(), "deploy lock acquired");
            return Ok(Some(Self::held(path, None)));
        }

        let Some(observed) = read_raw(&path)? else {
            // Released between our attempt and the read.
            return Ok(create_exclusive(&path, &content)?.then(|| Self::held(path, None)));
        };
        let reclaimed = match serde_json::from_str::<LockInfo>(&observed) {
            Ok(existing) if existing.is_alive() => return Ok(None),
            Ok(existing) => format!(
                "reclaimed stale lock from dead process {} (`{}` since {})",
                existing.pid, existing.command, existing.started_at
            ),
            Err(e) => format!("reclaimed unreadable lock file ({})", e),
        };

        let Some(_guard) = ReclaimGuard::take(deploy_dir)? else {
            return Ok(None);
        };
        if read_raw(&path)?.as_deref() != Some(observed.as_str()) {
            tracing::debug!("stale lock already replaced by another process");
            return Ok(None);
        }

        tracing::warn!("{}", reclaimed);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(DeployError::lock_io("failed to remove stale lock", e)),
        }

        if create_exclusive(&path, &content)? {
            Ok(Some(Self::held(path, Some(reclaimed))))
        } else {
            Ok(None)
        }
    }

    /// Take the lock or fail with `LockContention` naming the holder.
    pub fn acquire(deploy_dir: &Path, command: &str) -> Result<Self, DeployError> {
        match Self::try_acquire(deploy_dir, command)? {
            Some(lock) => Ok(lock),
            None => {
                let holder = LockInfo::read(deploy_dir)
                    .ok()
                    .flatten()
                    .map(|info| info.holder());
                Err(DeployError::LockContention(holder))
            }
        }
    }

    /// Run `work` while holding the lock, releasing it on every exit path.
    ///
    /// Release failures are recorded as warnings, never returned, so they
    /// cannot replace the outcome of `work`.
    pub async fn with_lock<T, E, Fut>(
        deploy_dir: &Path,
        command: &str,
        diag: &Diagnostics,
        work: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<DeployError>,
    {
        let lock = Self::acquire(deploy_dir, command)?;
        if let Some(message) = lock.reclaimed() {
            diag.warn(Warning::stale_lock_reclaimed(message));
        }

        let result = work.await;

        if let Err(e) = lock.release() {
            diag.warn(Warning::lock_release(format!(
                "failed to release deploy lock: {}",
                e
            )));
        }
        result
    }

    fn held(path: PathBuf, reclaimed: Option<String>) -> Self {
        Self {
            path,
            reclaimed,
            released: false,
        }
    }

    /// Description of the stale lock removed to acquire this one, if any.
    pub fn reclaimed(&self) -> Option<&str> {
        self.reclaimed.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the lock file. A missing file counts as released.
    pub fn release(mut self) -> Result<(), DeployError> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeployError::lock_io("failed to remove lock file", e)),
        }
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!("failed to release deploy lock {}: {}", self.path.display(), e);
        }
    }
}

/// Short-lived marker serialising stale-lock reclamation. Removed on drop.
struct ReclaimGuard {
    path: PathBuf,
}

impl ReclaimGuard {
    /// `Ok(None)` if another process is reclaiming. A guard older than
    /// [`RECLAIM_GUARD_TTL`] is removed so the next attempt can proceed.
    fn take(deploy_dir: &Path) -> Result<Option<Self>, DeployError> {
        let path = deploy_dir.join(RECLAIM_FILE);
        if create_exclusive(&path, &std::process::id().to_string())? {
            return Ok(Some(Self { path }));
        }

        let abandoned = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > RECLAIM_GUARD_TTL);
        if abandoned {
            tracing::warn!(path = %path.display(), "removing abandoned reclaim guard");
            let _ = fs::remove_file(&path);
        }
        Ok(None)
    }
}

impl Drop for ReclaimGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!("failed to remove reclaim guard {}: {}", self.path.display(), e);
        }
    }
}

fn read_raw(path: &Path) -> Result<Option<String>, DeployError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DeployError::lock_io("failed to read lock file", e)),
    }
}

/// Atomically create `path` with `content` unless it exists.
///
/// The content is written to a private temp file first and hard-linked into
/// place, so the lock file is never observable half-written.
fn create_exclusive(path: &Path, content: &str) -> Result<bool, DeployError> {
    let temp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        LOCK_FILE,
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    fs::write(&temp, content).map_err(|e| DeployError::lock_io("failed to write lock", e))?;

    let linked = fs::hard_link(&temp, path);
    let _ = fs::remove_file(&temp);

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(DeployError::lock_io("failed to create lock file", e)),
    }
}
