// ABOUTME: Image references pulled for a release: `[registry/]repository[:tag][@digest]`.
// ABOUTME: Built from the configured registry and release version, or parsed from per-service overrides.

use super::Version;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character {0:?} in image reference")]
    InvalidChar(char),

    #[error("malformed image reference: {0}")]
    Malformed(String),
}

/// A pullable image. References without tag or digest resolve to `latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Everything before the tag, registry host included.
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

fn allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || "/:.-_@".contains(c)
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }
        if let Some(bad) = input.chars().find(|c| !allowed(*c)) {
            return Err(ParseImageRefError::InvalidChar(bad));
        }

        let (named, digest) = match input.split_once('@') {
            Some((named, digest)) if !digest.is_empty() => (named, Some(digest.to_string())),
            Some(_) => return Err(ParseImageRefError::Malformed(input.to_string())),
            None => (input, None),
        };

        // The tag separator is the last colon after the last slash; earlier
        // colons are registry ports.
        let last_slash = named.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match named[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&named[..split], Some(named[split + 1..].to_string()))
            }
            None => (named, None),
        };

        let malformed = repository.is_empty()
            || repository.split('/').any(str::is_empty)
            || tag.as_deref() == Some("");
        if malformed {
            return Err(ParseImageRefError::Malformed(input.to_string()));
        }

        let tag = if tag.is_none() && digest.is_none() {
            Some("latest".to_string())
        } else {
            tag
        };

        Ok(Self {
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// `{registry}/{service}:{version}`. The registry may carry an
    /// organisation path (`ghcr.io/acme`) or be empty.
    pub fn for_release(
        registry: &str,
        service: &str,
        version: &Version,
    ) -> Result<Self, ParseImageRefError> {
        match registry.trim_end_matches('/') {
            "" => Self::parse(&format!("{service}:{version}")),
            registry => Self::parse(&format!("{registry}/{service}:{version}")),
        }
    }

    /// Registry host, when the first path component looks like one.
    pub fn registry(&self) -> Option<&str> {
        let (first, _) = self.repository.split_once('/')?;
        let is_host = first.contains('.') || first.contains(':') || first == "localhost";
        is_host.then_some(first)
    }

    /// Repository path without the registry host.
    pub fn name(&self) -> &str {
        match self.registry() {
            Some(host) => &self.repository[host.len() + 1..],
            None => &self.repository,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}
