use std::path::PathBuf;

use clap::Parser;

/// LLM gateway: routes, load-balances, and fails over chat completion and
/// messages requests across upstream providers.
#[derive(Debug, Parser)]
#[command(name = "gateway", about = "Multi-upstream LLM API gateway")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gateway.toml", env = "GATEWAY_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "GATEWAY_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
