// ABOUTME: Health gate timing configuration.
// ABOUTME: Bounds how long a rollout waits for containers before aborting.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(180)
}

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            timeout: default_timeout(),
            interval: default_interval(),
        }
    }
}
