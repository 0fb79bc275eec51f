// ABOUTME: State transition methods for rollouts.
// ABOUTME: Each method consumes self and returns the next state on success.

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::health::{self, HealthCheckOptions};
use crate::runtime::{ComposeOps, ComposeRequest, ContainerOps, ImageOps};
use crate::types::{Color, ImageRef, RotatableService, ServiceKind};

use super::Rollout;
use super::decommission::decommission;
use super::error::DeployError;
use super::state::{Completed, ImagesPulled, Planned, SlotHealthy, SlotStarted, Switched};
use super::store::StateStore;

// =============================================================================
// Planned -> ImagesPulled
// =============================================================================

impl Rollout<Planned> {
    /// Pull every image one after another; the first failure aborts before
    /// any container is touched.
    #[must_use = "rollout state must be used"]
    pub async fn pull_images<R: ImageOps + ?Sized>(
        self,
        runtime: &R,
        images: &[ImageRef],
    ) -> Result<Rollout<ImagesPulled>, DeployError> {
        for image in images {
            tracing::info!(image = %image, "pulling");
            runtime.pull_image(image).await?;
        }
        Ok(self.transition())
    }

    /// Pull every image concurrently; any failure aborts.
    #[must_use = "rollout state must be used"]
    pub async fn pull_images_concurrently<R: ImageOps + ?Sized>(
        self,
        runtime: &R,
        images: &[ImageRef],
    ) -> Result<Rollout<ImagesPulled>, DeployError> {
        try_join_all(images.iter().map(|image| runtime.pull_image(image))).await?;
        Ok(self.transition())
    }
}

// =============================================================================
// ImagesPulled -> SlotStarted
// =============================================================================

impl Rollout<ImagesPulled> {
    /// Bring the target slot's services up.
    #[must_use = "rollout state must be used"]
    pub async fn start_slot<R: ComposeOps + ?Sized>(
        self,
        runtime: &R,
        request: &ComposeRequest,
    ) -> Result<Rollout<SlotStarted>, DeployError> {
        tracing::info!(color = %self.target, services = ?request.services, "starting slot");
        runtime.compose_up(request).await?;
        Ok(self.transition())
    }
}

// =============================================================================
// SlotStarted -> SlotHealthy
// =============================================================================

impl Rollout<SlotStarted> {
    /// Gate every target container on its health check. The failed slot is
    /// left in place for inspection.
    #[must_use = "rollout state must be used"]
    pub async fn health_check<R: ContainerOps + ?Sized>(
        self,
        runtime: &R,
        config: &Config,
        cancel: &CancellationToken,
    ) -> Result<Rollout<SlotHealthy>, DeployError> {
        for service in &self.services {
            let container = service.container_name(&config.project, self.target);
            gate(
                runtime,
                config,
                ServiceKind::Rotatable(*service),
                Some(self.target),
                &container,
                cancel,
            )
            .await?;
        }
        Ok(self.transition())
    }
}

// =============================================================================
// SlotHealthy -> Switched | Completed
// =============================================================================

impl Rollout<SlotHealthy> {
    /// Record the target slot as active. This is the traffic switch.
    #[must_use = "rollout state must be used"]
    pub fn switch(self, store: &StateStore) -> Result<Rollout<Switched>, DeployError> {
        store.set_current_color(self.target)?;
        Ok(self.transition())
    }

    /// Finish an in-place update; the active color is unchanged.
    pub fn keep_in_place(self) -> Rollout<Completed> {
        self.transition()
    }
}

// =============================================================================
// Switched -> Completed
// =============================================================================

impl Rollout<Switched> {
    /// Drain, then stop and remove the replaced slot.
    ///
    /// Traffic has already moved, so nothing here can fail the rollout:
    /// removal failures and interruptions become warnings.
    pub async fn decommission<R: ContainerOps + ?Sized>(
        self,
        runtime: &R,
        config: &Config,
        cancel: &CancellationToken,
        diag: &Diagnostics,
    ) -> Rollout<Completed> {
        let Some(old) = self.replaces else {
            return self.transition();
        };

        if !config.drain.is_zero() {
            tracing::info!(color = %old, drain = ?config.drain, "draining");
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(config.drain) => {}
            }
        }
        if cancel.is_cancelled() {
            diag.warn(Warning::interrupted(format!(
                "interrupted while draining; {} containers are still running, run `cutover cleanup` to remove them",
                old
            )));
            return self.transition();
        }

        let containers: Vec<String> = RotatableService::ALL
            .iter()
            .map(|s| s.container_name(&config.project, old))
            .collect();
        let result = decommission(runtime, &containers, config.stop.timeout).await;
        for failure in result.failed {
            diag.warn(Warning::decommission(format!(
                "failed to remove {}: {}",
                failure.container, failure.error
            )));
        }

        self.transition()
    }
}

/// Wait for one container to pass its health gate.
///
/// The container must be running and healthy. A configured HTTP probe is
/// resolved for this container's slot and must answer 2xx as well.
pub(crate) async fn gate<R: ContainerOps + ?Sized>(
    runtime: &R,
    config: &Config,
    service: ServiceKind,
    color: Option<Color>,
    container: &str,
    cancel: &CancellationToken,
) -> Result<(), DeployError> {
    let options = HealthCheckOptions::from(&config.health);
    let url = config.http_health_url(service, color, container);
    let healthy =
        health::wait_for_service(runtime, container, url.as_deref(), options, cancel).await;

    if healthy {
        tracing::info!(container, "healthy");
        Ok(())
    } else if cancel.is_cancelled() {
        Err(DeployError::Interrupted)
    } else {
        Err(DeployError::HealthCheckTimeout {
            container: container.to_string(),
            timeout_secs: options.timeout.as_secs(),
        })
    }
}
