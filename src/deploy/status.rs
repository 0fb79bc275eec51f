// ABOUTME: Read-only status report: lock holder, persisted state, and per-container health.
// ABOUTME: Takes no lock and works without a runtime, reporting only what it can see.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::ContainerOps;
use crate::types::{Color, RotatableService, StatefulService};

use super::error::DeployError;
use super::lock::LockInfo;
use super::store::{DeploymentState, StateStore};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub deploy_dir: PathBuf,
    pub lock: Option<LockStatus>,
    pub state: DeploymentState,
    /// False when no container runtime was reachable; service lists are empty.
    pub runtime_available: bool,
    pub stateful: Vec<ServiceStatus>,
    pub slots: Vec<SlotStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// False means the lock is stale and the next mutating command reclaims it.
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatus {
    pub color: Color,
    pub active: bool,
    pub services: Vec<ServiceStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub service: String,
    pub container: String,
    pub running: bool,
    pub health: Option<String>,
    pub version: Option<String>,
}

/// Build a status report. Only unreadable state files are errors.
pub async fn collect_status<R: ContainerOps + ?Sized>(
    deploy_dir: &Path,
    config: &Config,
    runtime: Option<&R>,
    diag: &Diagnostics,
) -> Result<StatusReport, DeployError> {
    let lock = match LockInfo::read(deploy_dir) {
        Ok(info) => info.map(|info| LockStatus {
            alive: info.is_alive(),
            pid: info.pid,
            started_at: info.started_at,
            command: info.command,
            hostname: info.hostname,
        }),
        Err(e) => {
            diag.warn(Warning::state_file(e.to_string()));
            None
        }
    };

    let state = StateStore::new(deploy_dir).load(diag)?;

    let (stateful, slots) = match runtime {
        Some(runtime) => {
            let mut stateful = Vec::new();
            for service in StatefulService::ALL {
                let container = service.container_name(&config.project);
                stateful.push(inspect(runtime, service.as_str(), container).await);
            }

            let mut slots = Vec::new();
            for color in Color::ALL {
                let mut services = Vec::new();
                for service in RotatableService::ALL {
                    let container = service.container_name(&config.project, color);
                    services.push(inspect(runtime, service.as_str(), container).await);
                }
                slots.push(SlotStatus {
                    color,
                    active: state.current_color == Some(color),
                    services,
                });
            }
            (stateful, slots)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(StatusReport {
        deploy_dir: deploy_dir.to_path_buf(),
        lock,
        state,
        runtime_available: runtime.is_some(),
        stateful,
        slots,
    })
}

async fn inspect<R: ContainerOps + ?Sized>(runtime: &R, service: &str, container: String) -> ServiceStatus {
    let running = runtime.inspect_running(&container).await.unwrap_or_else(|e| {
        tracing::debug!(container = %container, error = %e, "inspect failed");
        false
    });
    let (health, version) = if running {
        (
            runtime
                .inspect_health(&container)
                .await
                .ok()
                .map(|h| h.as_str().to_string()),
            runtime.inspect_version_label(&container).await.ok().flatten(),
        )
    } else {
        (None, None)
    };

    ServiceStatus {
        service: service.to_string(),
        container,
        running,
        health,
        version,
    }
}

impl StatusReport {
    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Deploy directory: {}", self.deploy_dir.display());

        match &self.lock {
            Some(lock) if lock.alive => {
                let _ = writeln!(
                    out,
                    "Lock: held by `{}` (pid {}) since {}",
                    lock.command, lock.pid, lock.started_at
                );
            }
            Some(lock) => {
                let _ = writeln!(
                    out,
                    "Lock: stale (pid {} is gone; reclaimed on next command)",
                    lock.pid
                );
            }
            None => {
                let _ = writeln!(out, "Lock: free");
            }
        }

        let _ = writeln!(
            out,
            "Active color: {}",
            self.state
                .current_color
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        let _ = writeln!(
            out,
            "Previous version: {}",
            self.state.previous_version.as_deref().unwrap_or("none")
        );

        if !self.runtime_available {
            let _ = writeln!(out, "\nContainer runtime unavailable; container status not shown.");
            return out;
        }

        let _ = writeln!(out, "\nStateful services:");
        for service in &self.stateful {
            render_service(&mut out, service);
        }
        for slot in &self.slots {
            let marker = if slot.active { " (active)" } else { "" };
            let _ = writeln!(out, "\n{}{}:", slot.color, marker);
            for service in &slot.services {
                render_service(&mut out, service);
            }
        }
        out
    }
}

fn render_service(out: &mut String, service: &ServiceStatus) {
    if !service.running {
        let _ = writeln!(out, "  {:<10} {:<28} not running", service.service, service.container);
        return;
    }
    let _ = writeln!(
        out,
        "  {:<10} {:<28} running  health={}  version={}",
        service.service,
        service.container,
        service.health.as_deref().unwrap_or("unknown"),
        service.version.as_deref().unwrap_or("unknown")
    );
}
