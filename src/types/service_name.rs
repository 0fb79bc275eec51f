// ABOUTME: Service names of the managed stack, split into rotatable and stateful kinds.
// ABOUTME: Resolved once at the CLI boundary and matched exhaustively afterwards.

use super::Color;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("unknown service '{0}' (expected one of: platform, rag, crawler, operator, db, graph-db, proxy)")]
    Unknown(String),
}

/// Services that exist once per color and are replaced during a rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotatableService {
    Platform,
    Rag,
    Crawler,
    Operator,
}

impl RotatableService {
    pub const ALL: [RotatableService; 4] = [
        RotatableService::Platform,
        RotatableService::Rag,
        RotatableService::Crawler,
        RotatableService::Operator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RotatableService::Platform => "platform",
            RotatableService::Rag => "rag",
            RotatableService::Crawler => "crawler",
            RotatableService::Operator => "operator",
        }
    }

    /// Compose service key for this service in a color slot.
    pub fn slot_key(&self, color: Color) -> String {
        format!("{}-{}", self.as_str(), color)
    }

    /// `{project}-{service}-{color}`
    pub fn container_name(&self, project: &str, color: Color) -> String {
        format!("{}-{}-{}", project, self.as_str(), color)
    }
}

/// Services that exist once, uncolored, and are updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatefulService {
    Db,
    GraphDb,
    Proxy,
}

impl StatefulService {
    pub const ALL: [StatefulService; 3] = [
        StatefulService::Db,
        StatefulService::GraphDb,
        StatefulService::Proxy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatefulService::Db => "db",
            StatefulService::GraphDb => "graph-db",
            StatefulService::Proxy => "proxy",
        }
    }

    /// `{project}-{service}`
    pub fn container_name(&self, project: &str) -> String {
        format!("{}-{}", project, self.as_str())
    }

    /// Named volume holding this service's data, if it keeps any.
    pub fn data_volume(&self, project: &str) -> Option<String> {
        match self {
            StatefulService::Db | StatefulService::GraphDb => {
                Some(format!("{}-{}-data", project, self.as_str()))
            }
            StatefulService::Proxy => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ServiceKind {
    Rotatable(RotatableService),
    Stateful(StatefulService),
}

impl ServiceKind {
    pub fn parse(value: &str) -> Result<Self, ServiceNameError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ServiceNameError::Empty);
        }

        if let Some(service) = RotatableService::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
        {
            return Ok(ServiceKind::Rotatable(service));
        }

        StatefulService::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .map(ServiceKind::Stateful)
            .ok_or_else(|| ServiceNameError::Unknown(value.to_string()))
    }

    /// Parse a comma-separated list such as `platform,rag`. Duplicates are dropped.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, ServiceNameError> {
        let mut services = Vec::new();
        for part in value.split(',').filter(|p| !p.trim().is_empty()) {
            let service = Self::parse(part)?;
            if !services.contains(&service) {
                services.push(service);
            }
        }
        if services.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        Ok(services)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Rotatable(s) => s.as_str(),
            ServiceKind::Stateful(s) => s.as_str(),
        }
    }
}

impl FromStr for ServiceKind {
    type Err = ServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RotatableService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StatefulService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
