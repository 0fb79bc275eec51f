// ABOUTME: Configuration types and loading for cutover.yml plus environment overrides.
// ABOUTME: Resolves the deploy directory and per-service image, env, and probe settings.

mod env_value;
mod healthcheck;
mod stop;

pub use env_value::{EnvValue, resolve_env_map};
pub use healthcheck::HealthConfig;
pub use stop::StopConfig;

use crate::error::{Error, Result};
use crate::runtime::RuntimeType;
use crate::types::{Color, ImageRef, RotatableService, ServiceKind, StatefulService, Version};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "cutover.yml";

pub const ENV_REGISTRY: &str = "CUTOVER_REGISTRY";
pub const ENV_HEALTH_TIMEOUT: &str = "CUTOVER_HEALTH_TIMEOUT";
pub const ENV_DRAIN_TIMEOUT: &str = "CUTOVER_DRAIN_TIMEOUT";
pub const ENV_DEPLOY_DIR: &str = "CUTOVER_DEPLOY_DIR";

/// Default deploy directory, relative to `$HOME` (XDG state dir layout).
const STATE_DIR: &str = ".local/state/cutover";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_project")]
    pub project: String,

    #[serde(default)]
    pub registry: String,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default = "default_drain", with = "humantime_serde")]
    pub drain: Duration,

    #[serde(default)]
    pub stop: StopConfig,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    #[serde(default)]
    pub network: Option<String>,

    /// Public hostname routed by the proxy service.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// Full image reference; overrides `{registry}/{service}:{version}`.
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    /// URL that must answer 2xx, on top of the container's own healthcheck.
    /// `{container}`, `{color}` and `{service}` are replaced per slot; rotatable
    /// services must use one of the first two.
    #[serde(default)]
    pub http_health: Option<String>,

    /// Host port bindings. Stateful services only: both colors of a rotatable
    /// service run side by side during a deploy.
    #[serde(default)]
    pub ports: Vec<String>,
}

fn default_project() -> String {
    "cutover".to_string()
}

fn default_drain() -> Duration {
    Duration::from_secs(30)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(600)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project: default_project(),
            registry: String::new(),
            health: HealthConfig::default(),
            drain: default_drain(),
            stop: StopConfig::default(),
            command_timeout: default_command_timeout(),
            network: None,
            host: None,
            runtime: None,
            services: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `cutover.yml` from the deploy directory (if present) and apply
    /// environment overrides on top.
    pub fn load(deploy_dir: &Path) -> Result<Self> {
        let path = deploy_dir.join(CONFIG_FILENAME);
        let config = match std::fs::read_to_string(&path) {
            Ok(content) => serde_yaml::from_str(&content)
                .map_err(|source| Error::ConfigParse { path, source })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CUTOVER_*` environment overrides.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(registry) = std::env::var(ENV_REGISTRY) {
            self.registry = registry;
        }
        if let Some(timeout) = env_seconds(ENV_HEALTH_TIMEOUT)? {
            self.health.timeout = timeout;
        }
        if let Some(drain) = env_seconds(ENV_DRAIN_TIMEOUT)? {
            self.drain = drain;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        validate_project(&self.project)?;

        for (name, settings) in &self.services {
            let kind = ServiceKind::parse(name)
                .map_err(|e| Error::InvalidConfig(format!("services.{}: {}", name, e)))?;
            if let ServiceKind::Rotatable(_) = kind {
                validate_rotatable(name, settings)?;
            }
        }

        if self.health.interval.is_zero() {
            return Err(Error::InvalidConfig(
                "health.interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Network shared by both color slots and the stateful services.
    pub fn network_name(&self) -> String {
        self.network
            .clone()
            .unwrap_or_else(|| format!("{}-network", self.project))
    }

    pub fn service(&self, service: ServiceKind) -> Option<&ServiceConfig> {
        self.services.get(service.as_str())
    }

    /// Image a service runs at the given release version.
    pub fn image_for(&self, service: ServiceKind, version: &Version) -> Result<ImageRef> {
        let image = match self.service(service).and_then(|s| s.image.as_deref()) {
            Some(image) => ImageRef::parse(image),
            None => ImageRef::for_release(&self.registry, service.as_str(), version),
        };
        image.map_err(|e| Error::InvalidConfig(format!("image for {}: {}", service, e)))
    }

    pub fn rotatable_image(&self, service: RotatableService, version: &Version) -> Result<ImageRef> {
        self.image_for(ServiceKind::Rotatable(service), version)
    }

    pub fn stateful_image(&self, service: StatefulService, version: &Version) -> Result<ImageRef> {
        self.image_for(ServiceKind::Stateful(service), version)
    }

    /// Configured probe URL, placeholders unresolved.
    pub fn http_health(&self, service: ServiceKind) -> Option<&str> {
        self.service(service).and_then(|s| s.http_health.as_deref())
    }

    /// Probe URL for one container, with slot placeholders filled in.
    pub fn http_health_url(
        &self,
        service: ServiceKind,
        color: Option<Color>,
        container: &str,
    ) -> Option<String> {
        let template = self.http_health(service)?;
        let color = color.map(|c| c.to_string()).unwrap_or_default();
        Some(
            template
                .replace("{container}", container)
                .replace("{color}", &color)
                .replace("{service}", service.as_str()),
        )
    }
}

fn validate_rotatable(name: &str, settings: &ServiceConfig) -> Result<()> {
    if !settings.ports.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "services.{}.ports: rotatable services cannot bind host ports; route traffic through the proxy",
            name
        )));
    }
    if let Some(url) = &settings.http_health
        && !url.contains("{container}")
        && !url.contains("{color}")
    {
        return Err(Error::InvalidConfig(format!(
            "services.{}.http_health must address the slot with {{container}} or {{color}}",
            name
        )));
    }
    Ok(())
}

/// Resolve the deploy directory: explicit flag, then `CUTOVER_DEPLOY_DIR`,
/// then `$HOME/.local/state/cutover`.
pub fn resolve_deploy_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(ENV_DEPLOY_DIR)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    std::env::var("HOME")
        .map(|home| Path::new(&home).join(STATE_DIR))
        .map_err(|_| {
            Error::InvalidConfig(format!(
                "cannot determine deploy directory: pass --dir or set {}",
                ENV_DEPLOY_DIR
            ))
        })
}

fn env_seconds(var: &str) -> Result<Option<Duration>> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| {
                Error::InvalidConfig(format!("{} must be a whole number of seconds", var))
            }),
        Err(_) => Ok(None),
    }
}

fn validate_project(project: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidConfig(format!("project '{}' {}", project, reason));

    if project.is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if project.len() > 48 {
        return Err(invalid("exceeds 48 characters"));
    }
    if project.starts_with('-') || project.ends_with('-') {
        return Err(invalid("cannot start or end with a hyphen"));
    }
    if !project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("must be lowercase alphanumeric with hyphens"));
    }
    Ok(())
}
