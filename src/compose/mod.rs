// ABOUTME: Compose document generation for color slots and stateful services.
// ABOUTME: Typed structs serialized with serde_yaml; networks and volumes are external.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{Config, resolve_env_map};
use crate::error::Result;
use crate::runtime::traits::{LABEL_COLOR, LABEL_MANAGED, LABEL_PROJECT, LABEL_SERVICE, LABEL_VERSION};
use crate::types::{Color, RotatableService, ServiceKind, StatefulService, Version};

/// Environment variable carrying the public hostname to the proxy.
pub const HOST_ENV: &str = "CUTOVER_HOST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
    pub networks: BTreeMap<String, ExternalResource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, ExternalResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeService {
    pub container_name: String,
    pub image: String,
    pub restart: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub networks: BTreeMap<String, NetworkAttachment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAttachment {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// A network or volume created outside compose (by `ensure_network` /
/// `ensure_volume`) so that no compose project owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalResource {
    pub external: bool,
    pub name: String,
}

impl ExternalResource {
    fn named(name: &str) -> Self {
        Self {
            external: true,
            name: name.to_string(),
        }
    }
}

impl ComposeFile {
    /// Service keys to pass to `compose up`, in document order.
    pub fn service_keys(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// Names of the external volumes the services mount.
    pub fn volume_names(&self) -> Vec<String> {
        self.volumes.values().map(|v| v.name.clone()).collect()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Builds compose documents for one release version.
#[derive(Debug, Clone, Copy)]
pub struct ComposeBuilder<'a> {
    config: &'a Config,
    version: &'a Version,
    host: Option<&'a str>,
}

impl<'a> ComposeBuilder<'a> {
    pub fn new(config: &'a Config, version: &'a Version) -> Self {
        Self {
            config,
            version,
            host: config.host.as_deref(),
        }
    }

    /// Public hostname for the proxy; overrides the configured one.
    pub fn with_host(mut self, host: Option<&'a str>) -> Self {
        if host.is_some() {
            self.host = host;
        }
        self
    }

    /// Rotatable services in one color slot. Keys are `{service}-{color}`.
    pub fn rotatable(&self, services: &[RotatableService], color: Color) -> Result<ComposeFile> {
        let mut file = self.empty_file();
        for service in services {
            let kind = ServiceKind::Rotatable(*service);
            let mut compose = self.service(kind, service.container_name(&self.config.project, color))?;
            compose
                .labels
                .insert(LABEL_COLOR.to_string(), color.to_string());
            self.attach(&mut compose, vec![service.slot_key(color)]);
            file.services.insert(service.slot_key(color), compose);
        }
        Ok(file)
    }

    /// Uncolored stateful services, keyed by service name.
    pub fn stateful(&self, services: &[StatefulService]) -> Result<ComposeFile> {
        let mut file = self.empty_file();
        for service in services {
            let kind = ServiceKind::Stateful(*service);
            let mut compose = self.service(kind, service.container_name(&self.config.project))?;

            if let (Some(volume), Some(mount)) =
                (service.data_volume(&self.config.project), data_mount(*service))
            {
                compose.volumes.push(format!("{}:{}", volume, mount));
                file.volumes
                    .insert(volume.clone(), ExternalResource::named(&volume));
            }
            if *service == StatefulService::Proxy
                && let Some(host) = self.host
            {
                compose
                    .environment
                    .insert(HOST_ENV.to_string(), host.to_string());
            }

            self.attach(&mut compose, vec![service.as_str().to_string()]);
            file.services.insert(service.as_str().to_string(), compose);
        }
        Ok(file)
    }

    fn empty_file(&self) -> ComposeFile {
        let network = self.config.network_name();
        ComposeFile {
            services: BTreeMap::new(),
            networks: BTreeMap::from([(network.clone(), ExternalResource::named(&network))]),
            volumes: BTreeMap::new(),
        }
    }

    fn service(&self, kind: ServiceKind, container_name: String) -> Result<ComposeService> {
        let settings = self.config.service(kind);
        let environment = match settings {
            Some(s) => resolve_env_map(&s.env)?,
            None => BTreeMap::new(),
        };

        let labels = BTreeMap::from([
            (LABEL_MANAGED.to_string(), "true".to_string()),
            (LABEL_PROJECT.to_string(), self.config.project.clone()),
            (LABEL_SERVICE.to_string(), kind.as_str().to_string()),
            (LABEL_VERSION.to_string(), self.version.to_string()),
        ]);

        Ok(ComposeService {
            container_name,
            image: self.config.image_for(kind, self.version)?.to_string(),
            restart: "unless-stopped".to_string(),
            environment,
            labels,
            networks: BTreeMap::new(),
            ports: settings.map(|s| s.ports.clone()).unwrap_or_default(),
            volumes: Vec::new(),
        })
    }

    fn attach(&self, service: &mut ComposeService, aliases: Vec<String>) {
        service
            .networks
            .insert(self.config.network_name(), NetworkAttachment { aliases });
    }
}

fn data_mount(service: StatefulService) -> Option<&'static str> {
    match service {
        StatefulService::Db => Some("/var/lib/postgresql/data"),
        StatefulService::GraphDb => Some("/data"),
        StatefulService::Proxy => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_yaml(
            r#"
project: acme
registry: ghcr.io/acme
services:
  platform:
    env:
      LOG_LEVEL: info
  proxy:
    image: caddy:2
    ports: ["80:80", "443:443"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn rotatable_services_are_keyed_and_labelled_by_color() {
        let config = config();
        let version = Version::new("1.3.0").unwrap();
        let file = ComposeBuilder::new(&config, &version)
            .rotatable(&[RotatableService::Platform, RotatableService::Rag], Color::Green)
            .unwrap();

        assert_eq!(file.service_keys(), vec!["platform-green", "rag-green"]);
        let platform = &file.services["platform-green"];
        assert_eq!(platform.container_name, "acme-platform-green");
        assert_eq!(platform.image, "ghcr.io/acme/platform:1.3.0");
        assert_eq!(platform.labels[LABEL_COLOR], "green");
        assert_eq!(platform.labels[LABEL_VERSION], "1.3.0");
        assert_eq!(platform.environment["LOG_LEVEL"], "info");
        assert!(file.volumes.is_empty());
    }

    #[test]
    fn stateful_services_get_volumes_and_host() {
        let config = config();
        let version = Version::new("1.3.0").unwrap();
        let file = ComposeBuilder::new(&config, &version)
            .with_host(Some("app.example.com"))
            .stateful(&StatefulService::ALL)
            .unwrap();

        assert_eq!(file.services["db"].container_name, "acme-db");
        assert_eq!(
            file.services["db"].volumes,
            vec!["acme-db-data:/var/lib/postgresql/data"]
        );
        assert_eq!(file.services["proxy"].image, "caddy:2");
        assert_eq!(file.services["proxy"].environment[HOST_ENV], "app.example.com");
        assert!(!file.services["db"].labels.contains_key(LABEL_COLOR));
        assert_eq!(file.volume_names(), vec!["acme-db-data", "acme-graph-db-data"]);
    }

    #[test]
    fn yaml_declares_external_network() {
        let config = config();
        let version = Version::new("1.3.0").unwrap();
        let yaml = ComposeBuilder::new(&config, &version)
            .rotatable(&[RotatableService::Crawler], Color::Blue)
            .unwrap()
            .to_yaml()
            .unwrap();

        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(doc["networks"]["acme-network"]["external"], serde_yaml::Value::Bool(true));
        assert_eq!(
            doc["services"]["crawler-blue"]["networks"]["acme-network"]["aliases"][0],
            serde_yaml::Value::String("crawler-blue".to_string())
        );
    }
}
