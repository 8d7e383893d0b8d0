//! Configuration surface: TOML-backed, with `{{ env.VAR }}` placeholder
//! expansion for secrets and a validation pass before the rest of the
//! gateway ever sees a `GatewayConfig`.

mod cache;
mod detector;
mod duration;
mod env;
mod failover;
mod http;
mod loader;
mod router;
mod telemetry;

pub use cache::CacheConfig;
pub use detector::DetectorConfig;
pub use failover::FailoverConfig;
pub use http::HttpConfig;
pub use router::RouterConfig;
pub use telemetry::{LogFormat, TelemetryConfig};

use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub failover: FailoverConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
