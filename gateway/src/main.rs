#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::sync::Arc;

use args::Args;
use clap::Parser;
use gateway_config::GatewayConfig;
use gateway_model::testing::InMemoryStore;
use gateway_server::Server;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = GatewayConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.http.listen_address = listen;
    }

    gateway_telemetry::init(&config.telemetry);

    tracing::info!(config_path = %args.config.display(), "starting gateway");

    // The model/mapping/provider store is an external admin-owned
    // collaborator (see `ModelRepository`/`ProviderDirectory`); this binary
    // has no schema or CRUD surface of its own, so it wires up the
    // in-memory store and expects an operator or a separate admin process
    // to populate it out of band.
    let store = Arc::new(InMemoryStore::new());
    tracing::warn!("no admin/provider store configured; routing table starts empty");

    let server = Server::new(&config, Arc::clone(&store), store);

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.cancel();
    });

    server.serve(shutdown).await?;

    tracing::info!("gateway stopped");
    Ok(())
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
