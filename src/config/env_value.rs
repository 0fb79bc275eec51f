// ABOUTME: Service environment values with host environment interpolation.
// ABOUTME: Literal strings or `{env: VAR, default: ...}` references resolved at compose time.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => std::env::var(var)
                .ok()
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }
}

/// Resolve every value, sorted by key so generated compose files are stable.
pub fn resolve_env_map(map: &HashMap<String, EnvValue>) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve().map(|resolved| (k.clone(), resolved)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = EnvValue::Literal("info".to_string());
        assert_eq!(value.resolve().unwrap(), "info");
    }

    #[test]
    fn reference_falls_back_to_default() {
        let value = EnvValue::FromEnv {
            var: "CUTOVER_TEST_SURELY_UNSET_VAR".to_string(),
            default: Some("fallback".to_string()),
        };
        assert_eq!(value.resolve().unwrap(), "fallback");
    }

    #[test]
    fn missing_reference_without_default_errors() {
        let value = EnvValue::FromEnv {
            var: "CUTOVER_TEST_SURELY_UNSET_VAR".to_string(),
            default: None,
        };
        assert!(matches!(value.resolve(), Err(Error::MissingEnvVar(v)) if v == "CUTOVER_TEST_SURELY_UNSET_VAR"));
    }
}
