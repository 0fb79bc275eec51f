// ABOUTME: Persistent deployment state: the active color and one-slot version history.
// ABOUTME: Two small files in the deploy directory, replaced atomically via temp file + rename.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::diagnostics::{Diagnostics, Warning};
use crate::types::Color;

use super::error::DeployError;

pub const COLOR_FILE: &str = "current-color";
pub const PREVIOUS_VERSION_FILE: &str = "previous-version";

/// Immutable snapshot of the persisted deployment state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentState {
    pub current_color: Option<Color>,
    pub previous_version: Option<String>,
}

/// File-backed state store rooted at a deploy directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(deploy_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: deploy_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, diag: &Diagnostics) -> Result<DeploymentState, DeployError> {
        Ok(DeploymentState {
            current_color: self.current_color(diag)?,
            previous_version: self.previous_version()?,
        })
    }

    /// The active color. Unrecognised contents are treated as "no active
    /// color" and reported as a warning.
    pub fn current_color(&self, diag: &Diagnostics) -> Result<Option<Color>, DeployError> {
        let Some(raw) = self.read(COLOR_FILE)? else {
            return Ok(None);
        };
        match raw.parse::<Color>() {
            Ok(color) => Ok(Some(color)),
            Err(e) => {
                diag.warn(Warning::state_file(format!(
                    "ignoring {}: {}",
                    self.dir.join(COLOR_FILE).display(),
                    e
                )));
                Ok(None)
            }
        }
    }

    /// Record `color` as active. This is the traffic switch.
    pub fn set_current_color(&self, color: Color) -> Result<(), DeployError> {
        tracing::info!(color = %color, "switching active color");
        self.write_atomic(COLOR_FILE, color.as_str())
    }

    pub fn previous_version(&self) -> Result<Option<String>, DeployError> {
        self.read(PREVIOUS_VERSION_FILE)
    }

    pub fn set_previous_version(&self, version: &str) -> Result<(), DeployError> {
        self.write_atomic(PREVIOUS_VERSION_FILE, version)
    }

    /// Delete both state files. Missing files are fine.
    pub fn clear(&self) -> Result<(), DeployError> {
        for name in [COLOR_FILE, PREVIOUS_VERSION_FILE] {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(DeployError::state_store(&format!("failed to remove {}", name), e)),
            }
        }
        Ok(())
    }

    /// Trimmed file contents; `None` when missing or blank.
    fn read(&self, name: &str) -> Result<Option<String>, DeployError> {
        match fs::read_to_string(self.dir.join(name)) {
            Ok(content) => {
                let value = content.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DeployError::state_store(&format!("failed to read {}", name), e)),
        }
    }

    fn write_atomic(&self, name: &str, value: &str) -> Result<(), DeployError> {
        let context = format!("failed to write {}", name);
        fs::create_dir_all(&self.dir).map_err(|e| DeployError::state_store(&context, e))?;

        let target = self.dir.join(name);
        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", name, std::process::id()));
        fs::write(&temp, format!("{}\n", value)).map_err(|e| DeployError::state_store(&context, e))?;
        fs::rename(&temp, &target).map_err(|e| {
            let _ = fs::remove_file(&temp);
            DeployError::state_store(&context, e)
        })
    }
}
