//! Logging initialization. No metrics/OTLP export: the routing and failure
//! state this gateway manages is process-local and short-lived, and nothing
//! in scope needs an external collector.

use gateway_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global `tracing` subscriber from `config`.
///
/// `RUST_LOG`, if set, overrides `config.log_level`. Safe to call once per
/// process; a second call is a programmer error upstream, not something
/// this function guards against.
pub fn init(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    match config.log_format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }
}
