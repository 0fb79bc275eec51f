// ABOUTME: Deploy, rollback, reset, cleanup, status, and logs workflows over a container runtime.
// ABOUTME: Mutating workflows run under the deploy lock; dry runs only report what they would do.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::compose::ComposeBuilder;
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::hooks::{HookEnv, HookOutcome, HookPoint, Hooks};
use crate::output::{Output, OutputMode};
use crate::runtime::{ComposeRequest, FullRuntime, LogOptions};
use crate::types::{Color, ImageRef, RotatableService, ServiceKind, StatefulService, Version};

use super::Rollout;
use super::decommission::{CleanupResult, decommission};
use super::error::DeployError;
use super::lock::DeployLock;
use super::status::{StatusReport, collect_status};
use super::store::StateStore;
use super::transitions::gate;

/// Asks the operator to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub version: Version,
    /// Explicit service list: an in-place update of the active color.
    pub services: Option<Vec<ServiceKind>>,
    /// Include stateful services in a full deploy.
    pub all: bool,
    pub dry_run: bool,
    /// Public hostname for the proxy; overrides the configured one.
    pub host: Option<String>,
}

impl DeployRequest {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            services: None,
            all: false,
            dry_run: false,
            host: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RollbackRequest {
    /// Explicit target; defaults to the recorded previous version.
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResetRequest {
    pub force: bool,
    /// Also remove stateful containers.
    pub all: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySummary {
    pub version: Version,
    /// Color serving the release: the new slot, or the active one for an
    /// in-place update.
    pub color: Color,
    /// Color that stopped receiving traffic, if any.
    pub replaced: Option<Color>,
    pub in_place: bool,
    pub dry_run: bool,
    /// `[dry-run] would ...` lines; empty for real runs.
    pub planned: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackSummary {
    pub version: Version,
    pub color: Color,
    pub replaced: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The operator declined the confirmation; nothing was touched.
    Cancelled,
    Reset {
        result: CleanupResult,
        dry_run: bool,
        planned: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    NoActiveDeployment,
    Cleaned { color: Color, result: CleanupResult },
}

/// What a deploy will do, resolved from the request and the active color.
#[derive(Debug, Clone)]
struct DeployPlan {
    mode: Mode,
    rotatable: Vec<RotatableService>,
    stateful: Vec<StatefulService>,
    images: Vec<ImageRef>,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    BlueGreen { current: Option<Color>, target: Color },
    InPlace { active: Color },
}

/// Runs workflows for one deploy directory against one runtime.
pub struct Orchestrator<'a, R: ?Sized> {
    runtime: &'a R,
    config: Config,
    deploy_dir: PathBuf,
    store: StateStore,
    hooks: Hooks,
    output: Output,
    diag: Diagnostics,
    cancel: CancellationToken,
}

impl<'a, R: FullRuntime + ?Sized> Orchestrator<'a, R> {
    pub fn new(runtime: &'a R, config: Config, deploy_dir: impl Into<PathBuf>) -> Self {
        let deploy_dir = deploy_dir.into();
        let hooks = Hooks::new(&deploy_dir).with_timeout(config.command_timeout);
        Self {
            runtime,
            config,
            store: StateStore::new(&deploy_dir),
            hooks,
            deploy_dir,
            output: Output::new(OutputMode::Normal),
            diag: Diagnostics::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Token that interrupts health polling and draining when cancelled.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn deploy_dir(&self) -> &Path {
        &self.deploy_dir
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    // =========================================================================
    // Deploy
    // =========================================================================

    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeploySummary> {
        if request.dry_run {
            return self.deploy_dry_run(request).await;
        }

        let command = format!("deploy {}", request.version);
        let mut context = HookEnv::new(self.config.project.as_str(), command.as_str());
        context.version = Some(request.version.to_string());
        context.color = self.store.current_color(&self.diag)?;
        context.previous_version = self.store.previous_version()?;
        self.run_hook(HookPoint::PreDeploy, &context).await?;

        let result = DeployLock::with_lock(
            &self.deploy_dir,
            &command,
            &self.diag,
            self.deploy_locked(request),
        )
        .await;

        match &result {
            Ok(summary) => {
                context.color = Some(summary.color);
                context.previous_version = self.store.previous_version().ok().flatten();
                self.run_hook(HookPoint::PostDeploy, &context).await?;
            }
            Err(_) => self.run_hook(HookPoint::OnError, &context).await?,
        }
        result
    }

    async fn deploy_locked(&self, request: &DeployRequest) -> Result<DeploySummary> {
        let current = self.store.current_color(&self.diag)?;
        let plan = self.plan(request, current)?;
        let host = request.host.as_deref();
        let version = &request.version;

        let rollout = match plan.mode {
            Mode::BlueGreen { current, .. } => Rollout::blue_green(current, version.clone()),
            Mode::InPlace { active } => {
                Rollout::in_place(active, version.clone(), plan.rotatable.clone())
            }
        };

        self.output
            .progress(&format!("Pulling {} image(s) for {}...", plan.images.len(), version));
        let rollout = rollout.pull_images(self.runtime, &plan.images).await?;

        self.ensure_infrastructure(&plan.stateful).await?;
        if !plan.stateful.is_empty() {
            self.start_stateful(&plan.stateful, version, host).await?;
        }

        if let Mode::BlueGreen {
            current: Some(active),
            ..
        } = plan.mode
        {
            self.record_previous_version(active).await;
        }

        let summary = DeploySummary {
            version: version.clone(),
            color: rollout.target(),
            replaced: None,
            in_place: matches!(plan.mode, Mode::InPlace { .. }),
            dry_run: false,
            planned: Vec::new(),
        };

        // Stateful-only update: nothing to roll out in a color slot.
        if rollout.services().is_empty() {
            return Ok(summary);
        }

        let request = rollout.compose_request(&self.config, host)?;
        self.output.progress(&format!(
            "Starting {} in {}...",
            request.services.join(", "),
            rollout.target()
        ));
        let rollout = rollout.start_slot(self.runtime, &request).await?;

        self.output.progress("Waiting for health checks...");
        let rollout = rollout
            .health_check(self.runtime, &self.config, &self.cancel)
            .await?;

        match plan.mode {
            Mode::InPlace { .. } => {
                rollout.keep_in_place();
                Ok(summary)
            }
            Mode::BlueGreen { current, target } => {
                let rollout = rollout.switch(&self.store)?;
                self.output
                    .progress(&format!("Traffic switched to {}", target));
                if let Some(old) = current {
                    self.output.progress(&format!(
                        "Draining {} for {}s...",
                        old,
                        self.config.drain.as_secs()
                    ));
                }
                rollout
                    .decommission(self.runtime, &self.config, &self.cancel, &self.diag)
                    .await;
                Ok(DeploySummary {
                    replaced: current,
                    ..summary
                })
            }
        }
    }

    async fn deploy_dry_run(&self, request: &DeployRequest) -> Result<DeploySummary> {
        let current = self.store.current_color(&self.diag)?;
        let plan = self.plan(request, current)?;
        let mut planned = Vec::new();
        let mut would = |line: String| {
            let line = format!("[dry-run] would {}", line);
            tracing::info!("{}", line);
            self.output.progress(&line);
            planned.push(line);
        };

        for image in &plan.images {
            would(format!("pull {}", image));
        }
        would(format!("ensure network {}", self.config.network_name()));
        for service in &plan.stateful {
            if let Some(volume) = service.data_volume(&self.config.project) {
                would(format!("ensure volume {}", volume));
            }
        }
        if !plan.stateful.is_empty() {
            let names: Vec<&str> = plan.stateful.iter().map(|s| s.as_str()).collect();
            would(format!("start stateful services {} and wait for health", names.join(", ")));
        }

        let (color, replaced, in_place) = match plan.mode {
            Mode::InPlace { active } => (active, None, true),
            Mode::BlueGreen { current, target } => (target, current, false),
        };

        if let Some(active) = replaced {
            let platform = RotatableService::Platform.container_name(&self.config.project, active);
            match self.runtime.inspect_version_label(&platform).await {
                Ok(Some(running)) => would(format!("record previous version {}", running)),
                _ => would(format!("record the version running in {} as previous", active)),
            }
        }

        if !plan.rotatable.is_empty() {
            let keys: Vec<String> = plan.rotatable.iter().map(|s| s.slot_key(color)).collect();
            would(format!("start {} and wait for health", keys.join(", ")));
        }

        if !in_place {
            would(format!(
                "switch active color {} -> {}",
                replaced.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
                color
            ));
            if let Some(old) = replaced {
                would(format!(
                    "drain {}s then stop and remove {} containers",
                    self.config.drain.as_secs(),
                    old
                ));
            }
        }

        Ok(DeploySummary {
            version: request.version.clone(),
            color,
            replaced,
            in_place,
            dry_run: true,
            planned,
        })
    }

    fn plan(&self, request: &DeployRequest, current: Option<Color>) -> Result<DeployPlan> {
        let (mode, rotatable, stateful) = match &request.services {
            Some(services) => {
                let active = current.ok_or(DeployError::NoActiveDeployment)?;
                let rotatable = services
                    .iter()
                    .filter_map(|s| match s {
                        ServiceKind::Rotatable(r) => Some(*r),
                        ServiceKind::Stateful(_) => None,
                    })
                    .collect();
                let stateful = services
                    .iter()
                    .filter_map(|s| match s {
                        ServiceKind::Stateful(s) => Some(*s),
                        ServiceKind::Rotatable(_) => None,
                    })
                    .collect();
                (Mode::InPlace { active }, rotatable, stateful)
            }
            None => {
                let stateful = if request.all || current.is_none() {
                    StatefulService::ALL.to_vec()
                } else {
                    Vec::new()
                };
                let mode = Mode::BlueGreen {
                    current,
                    target: Color::next(current),
                };
                (mode, RotatableService::ALL.to_vec(), stateful)
            }
        };

        let mut images: Vec<ImageRef> = Vec::new();
        let kinds = stateful
            .iter()
            .map(|s| ServiceKind::Stateful(*s))
            .chain(rotatable.iter().map(|r| ServiceKind::Rotatable(*r)));
        for kind in kinds {
            let image = self.config.image_for(kind, &request.version)?;
            if !images.contains(&image) {
                images.push(image);
            }
        }

        Ok(DeployPlan {
            mode,
            rotatable,
            stateful,
            images,
        })
    }

    async fn ensure_infrastructure(&self, stateful: &[StatefulService]) -> Result<()> {
        let project = &self.config.project;
        self.runtime
            .ensure_network(&self.config.network_name(), project)
            .await
            .map_err(DeployError::from)?;
        for volume in stateful.iter().filter_map(|s| s.data_volume(project)) {
            self.runtime
                .ensure_volume(&volume, project)
                .await
                .map_err(DeployError::from)?;
        }
        Ok(())
    }

    async fn start_stateful(
        &self,
        services: &[StatefulService],
        version: &Version,
        host: Option<&str>,
    ) -> Result<()> {
        let file = ComposeBuilder::new(&self.config, version)
            .with_host(host)
            .stateful(services)?;
        let request = ComposeRequest {
            project: self.config.project.clone(),
            file: file.to_yaml()?,
            services: file.service_keys(),
        };

        self.output
            .progress(&format!("Starting {}...", request.services.join(", ")));
        self.runtime
            .compose_up(&request)
            .await
            .map_err(DeployError::from)?;

        for service in services {
            let container = service.container_name(&self.config.project);
            gate(
                self.runtime,
                &self.config,
                ServiceKind::Stateful(*service),
                None,
                &container,
                &self.cancel,
            )
            .await?;
        }
        Ok(())
    }

    /// Remember the version the active color runs before replacing it.
    async fn record_previous_version(&self, active: Color) {
        let platform = RotatableService::Platform.container_name(&self.config.project, active);
        match self.runtime.inspect_version_label(&platform).await {
            Ok(Some(running)) => {
                if let Err(e) = self.store.set_previous_version(&running) {
                    self.diag
                        .warn(Warning::history(format!("failed to record previous version: {}", e)));
                }
            }
            Ok(None) => self.diag.warn(Warning::history(format!(
                "{} has no version label; previous version left unchanged",
                platform
            ))),
            Err(e) => self.diag.warn(Warning::history(format!(
                "failed to read version of {}: {}; previous version left unchanged",
                platform, e
            ))),
        }
    }

    // =========================================================================
    // Rollback
    // =========================================================================

    pub async fn rollback(&self, request: &RollbackRequest) -> Result<RollbackSummary> {
        let mut context = HookEnv::new(self.config.project.as_str(), "rollback");
        let result = DeployLock::with_lock(
            &self.deploy_dir,
            "rollback",
            &self.diag,
            self.rollback_locked(request),
        )
        .await;

        match &result {
            Ok(summary) => {
                context.version = Some(summary.version.to_string());
                context.color = Some(summary.color);
                context.previous_version = self.store.previous_version().ok().flatten();
                self.run_hook(HookPoint::PostRollback, &context).await?;
            }
            Err(_) => {
                context.version = request.version.as_ref().map(|v| v.to_string());
                self.run_hook(HookPoint::OnError, &context).await?;
            }
        }
        result
    }

    async fn rollback_locked(&self, request: &RollbackRequest) -> Result<RollbackSummary> {
        let active = self
            .store
            .current_color(&self.diag)?
            .ok_or(DeployError::NoActiveDeployment)?;

        let version = match &request.version {
            Some(version) => version.clone(),
            None => {
                let previous = self
                    .store
                    .previous_version()?
                    .ok_or(DeployError::NoPreviousVersion)?;
                Version::new(&previous).map_err(DeployError::from)?
            }
        };

        let target = active.opposite();
        let platform = RotatableService::Platform.container_name(&self.config.project, active);
        let running = match self.runtime.inspect_version_label(&platform).await {
            Ok(running) => running,
            Err(e) => {
                tracing::debug!(container = %platform, error = %e, "version inspect failed");
                None
            }
        };

        self.output
            .progress(&format!("Rolling back to {} in {}...", version, target));

        let images = RotatableService::ALL
            .iter()
            .map(|s| self.config.rotatable_image(*s, &version))
            .collect::<Result<Vec<_>>>()?;
        let rollout = Rollout::into_slot(target, active, version.clone())
            .pull_images_concurrently(self.runtime, &images)
            .await?;

        self.ensure_infrastructure(&[]).await?;
        let compose = rollout.compose_request(&self.config, None)?;
        let rollout = rollout.start_slot(self.runtime, &compose).await?;

        self.output.progress("Waiting for health checks...");
        let rollout = rollout
            .health_check(self.runtime, &self.config, &self.cancel)
            .await?;
        let rollout = rollout.switch(&self.store)?;
        self.output
            .progress(&format!("Traffic switched to {}", target));

        match running {
            Some(running) => {
                if let Err(e) = self.store.set_previous_version(&running) {
                    self.diag
                        .warn(Warning::history(format!("failed to record previous version: {}", e)));
                }
            }
            None => self.diag.warn(Warning::history(format!(
                "could not determine the version {} was running; previous version left unchanged",
                active
            ))),
        }

        rollout
            .decommission(self.runtime, &self.config, &self.cancel, &self.diag)
            .await;

        Ok(RollbackSummary {
            version,
            color: target,
            replaced: active,
        })
    }

    // =========================================================================
    // Reset
    // =========================================================================

    pub async fn reset(&self, request: ResetRequest, confirm: &dyn Confirm) -> Result<ResetOutcome> {
        let project = self.config.project.as_str();
        let mut containers: Vec<String> = Color::ALL
            .into_iter()
            .flat_map(|color| {
                RotatableService::ALL
                    .into_iter()
                    .map(move |s| s.container_name(project, color))
            })
            .collect();
        if request.all {
            containers.extend(
                StatefulService::ALL
                    .into_iter()
                    .map(|s| s.container_name(project)),
            );
        }

        if request.dry_run {
            let mut planned = Vec::new();
            for name in &containers {
                if self.runtime.container_exists(name).await.unwrap_or(true) {
                    planned.push(format!("[dry-run] would remove {}", name));
                }
            }
            planned.push(format!(
                "[dry-run] would delete deployment state in {}",
                self.deploy_dir.display()
            ));
            planned.push(format!(
                "[dry-run] would prune networks of project {}",
                self.config.project
            ));
            for line in &planned {
                tracing::info!("{}", line);
                self.output.progress(line);
            }
            return Ok(ResetOutcome::Reset {
                result: CleanupResult::default(),
                dry_run: true,
                planned,
            });
        }

        if !request.force {
            let scope = if request.all {
                "all containers including databases"
            } else {
                "all blue and green containers"
            };
            let prompt = format!(
                "This removes {} of project {} and its deployment state. Continue?",
                scope, self.config.project
            );
            if !confirm.confirm(&prompt) {
                return Ok(ResetOutcome::Cancelled);
            }
        }

        DeployLock::with_lock(&self.deploy_dir, "reset", &self.diag, async {
            let result = decommission(self.runtime, &containers, self.config.stop.timeout).await;
            for failure in &result.failed {
                self.diag.warn(Warning::decommission(format!(
                    "failed to remove {}: {}",
                    failure.container, failure.error
                )));
            }

            self.store.clear()?;

            if let Err(e) = self.runtime.prune_networks(&self.config.project).await {
                self.diag
                    .warn(Warning::decommission(format!("failed to prune networks: {}", e)));
            }

            Ok::<_, Error>(ResetOutcome::Reset {
                result,
                dry_run: false,
                planned: Vec::new(),
            })
        })
        .await
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Remove the inactive color's rotatable containers.
    pub async fn cleanup(&self) -> Result<CleanupOutcome> {
        DeployLock::with_lock(&self.deploy_dir, "cleanup", &self.diag, async {
            let Some(active) = self.store.current_color(&self.diag)? else {
                self.output.progress("No active deployment; nothing to clean up.");
                return Ok::<_, Error>(CleanupOutcome::NoActiveDeployment);
            };

            let inactive = active.opposite();
            let containers: Vec<String> = RotatableService::ALL
                .iter()
                .map(|s| s.container_name(&self.config.project, inactive))
                .collect();
            let result = decommission(self.runtime, &containers, self.config.stop.timeout).await;
            for failure in &result.failed {
                self.diag.warn(Warning::decommission(format!(
                    "failed to remove {}: {}",
                    failure.container, failure.error
                )));
            }

            Ok(CleanupOutcome::Cleaned {
                color: inactive,
                result,
            })
        })
        .await
    }

    // =========================================================================
    // Status & logs
    // =========================================================================

    pub async fn status(&self) -> Result<StatusReport> {
        Ok(collect_status(&self.deploy_dir, &self.config, Some(self.runtime), &self.diag).await?)
    }

    /// Stream a service's logs. Rotatable services default to the active color.
    pub async fn logs(
        &self,
        service: ServiceKind,
        color: Option<Color>,
        options: &LogOptions,
    ) -> Result<()> {
        let container = match service {
            ServiceKind::Stateful(s) => s.container_name(&self.config.project),
            ServiceKind::Rotatable(s) => {
                let color = match color {
                    Some(color) => color,
                    None => self
                        .store
                        .current_color(&self.diag)?
                        .ok_or(DeployError::NoActiveDeployment)?,
                };
                s.container_name(&self.config.project, color)
            }
        };
        self.runtime.stream_logs(&container, options).await?;
        Ok(())
    }

    async fn run_hook(&self, point: HookPoint, env: &HookEnv) -> Result<()> {
        let HookOutcome::Failed(detail) = self.hooks.fire(point, env).await else {
            return Ok(());
        };
        let message = format!("{} hook failed: {}", point.script_name(), detail);
        if point.aborts_workflow() {
            return Err(Error::Hook(message));
        }
        self.diag.warn(Warning::hook(message));
        Ok(())
    }
}
