use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::duration::deserialize_duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_upstream_timeout", deserialize_with = "deserialize_duration")]
    pub upstream_timeout: Duration,
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { upstream_timeout: default_upstream_timeout(), listen_address: default_listen_address() }
    }
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_listen_address() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("default listen address must parse")
}
