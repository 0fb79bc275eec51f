// ABOUTME: Generic rollout struct parameterized by state marker.
// ABOUTME: Tracks the target slot, the slot it replaces, and the release being rolled out.

use crate::compose::ComposeBuilder;
use crate::config::Config;
use crate::runtime::ComposeRequest;
use crate::types::{Color, RotatableService, Version};

use super::state::Planned;

/// A rollout of rotatable services into one color slot.
///
/// The traffic switch is only reachable from `Rollout<SlotHealthy>`, so a
/// slot that has not passed its health gate cannot become active.
#[derive(Debug)]
pub struct Rollout<S> {
    pub(crate) target: Color,
    pub(crate) replaces: Option<Color>,
    pub(crate) version: Version,
    pub(crate) services: Vec<RotatableService>,
    pub(crate) _state: S,
}

impl Rollout<Planned> {
    /// Full blue-green rollout: every rotatable service into the next slot.
    pub fn blue_green(current: Option<Color>, version: Version) -> Self {
        Rollout {
            target: Color::next(current),
            replaces: current,
            version,
            services: RotatableService::ALL.to_vec(),
            _state: Planned,
        }
    }

    /// Rollout into a chosen slot replacing `active` (rollback).
    pub fn into_slot(target: Color, active: Color, version: Version) -> Self {
        Rollout {
            target,
            replaces: Some(active),
            version,
            services: RotatableService::ALL.to_vec(),
            _state: Planned,
        }
    }

    /// In-place update of some services inside the active slot.
    pub fn in_place(active: Color, version: Version, services: Vec<RotatableService>) -> Self {
        Rollout {
            target: active,
            replaces: None,
            version,
            services,
            _state: Planned,
        }
    }
}

impl<S> Rollout<S> {
    pub fn target(&self) -> Color {
        self.target
    }

    /// Slot that stops receiving traffic once this rollout switches.
    pub fn replaces(&self) -> Option<Color> {
        self.replaces
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn services(&self) -> &[RotatableService] {
        &self.services
    }

    /// Target container names, `{project}-{service}-{color}`.
    pub fn containers(&self, project: &str) -> Vec<String> {
        self.services
            .iter()
            .map(|s| s.container_name(project, self.target))
            .collect()
    }

    pub(crate) fn transition<T: Default>(self) -> Rollout<T> {
        Rollout {
            target: self.target,
            replaces: self.replaces,
            version: self.version,
            services: self.services,
            _state: T::default(),
        }
    }
}

impl<S> Rollout<S> {
    /// Compose invocation bringing up this rollout's services in its slot.
    pub fn compose_request(
        &self,
        config: &Config,
        host: Option<&str>,
    ) -> crate::error::Result<ComposeRequest> {
        let file = ComposeBuilder::new(config, &self.version)
            .with_host(host)
            .rotatable(&self.services, self.target)?;
        Ok(ComposeRequest {
            project: config.project.clone(),
            file: file.to_yaml()?,
            services: file.service_keys(),
        })
    }
}
