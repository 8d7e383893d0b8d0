use std::time::Duration;

use serde::Deserialize;

use crate::duration::deserialize_duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_cooldown_duration", deserialize_with = "deserialize_duration")]
    pub cooldown_duration: Duration,
    /// Reference value used by the classifier; the detector itself never
    /// enforces this as a timeout.
    #[serde(default = "default_timeout_threshold", deserialize_with = "deserialize_duration")]
    pub timeout_threshold: Duration,
    #[serde(default = "default_cleanup_interval", deserialize_with = "deserialize_duration")]
    pub cleanup_interval: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_duration: default_cooldown_duration(),
            timeout_threshold: default_timeout_threshold(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_duration() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_timeout_threshold() -> Duration {
    Duration::from_secs(30)
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60 * 60)
}
