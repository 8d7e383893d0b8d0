use std::time::Duration;

use serde::Deserialize;

use crate::duration::deserialize_duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_ttl", deserialize_with = "deserialize_duration")]
    pub ttl: Duration,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_cleanup_interval", deserialize_with = "deserialize_duration")]
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: default_ttl(), max_size: default_max_size(), cleanup_interval: default_cleanup_interval() }
    }
}

fn default_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_size() -> usize {
    1000
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(10 * 60)
}
