//! Server assembly: wires the resolver, balancer, failure detector and
//! failover executor behind an axum router, and drives the listen loop.

mod error;
mod forward;
mod handler;
mod normalize;
mod state;

pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gateway_balancer::LoadBalancer;
use gateway_cache::RoutingCache;
use gateway_config::GatewayConfig;
use gateway_detector::FailureDetector;
use gateway_failover::{FailoverConfig, FailoverExecutor};
use gateway_model::{ModelRepository, ProviderDirectory};
use gateway_resolver::{MappingResolver, ResolverConfig};
use tokio_util::sync::CancellationToken;

/// A running (or about-to-run) gateway instance: the axum router plus the
/// background janitors it owns.
pub struct Server<R: ModelRepository, P: ProviderDirectory> {
    router: axum::Router,
    listen_address: SocketAddr,
    cache: Arc<RoutingCache>,
    detector: Arc<FailureDetector>,
    _repository_marker: std::marker::PhantomData<(R, P)>,
}

impl<R: ModelRepository + 'static, P: ProviderDirectory + 'static> Server<R, P> {
    /// Build the router and every long-lived singleton it depends on.
    /// `repository` and `providers` are the caller's collaborators satisfying
    /// `ModelRepository`/`ProviderDirectory`.
    pub fn new(config: &GatewayConfig, repository: Arc<R>, providers: Arc<P>) -> Self {
        let cache = Arc::new(RoutingCache::new(gateway_cache::CacheConfig {
            ttl: config.cache.ttl,
            max_size: config.cache.max_size,
            cleanup_interval: config.cache.cleanup_interval,
        }));

        let resolver = Arc::new(MappingResolver::new(
            Arc::clone(&repository),
            Arc::clone(&cache),
            ResolverConfig {
                health_check_enabled: config.router.health_check_enabled,
                weight_enabled: config.router.weight_enabled,
            },
        ));

        let balancer = Arc::new(LoadBalancer::new());

        let detector = Arc::new(FailureDetector::new(gateway_detector::DetectorConfig {
            failure_threshold: config.detector.failure_threshold,
            cooldown_duration: config.detector.cooldown_duration,
            cleanup_interval: config.detector.cleanup_interval,
        }));

        let failover = Arc::new(FailoverExecutor::new(
            Arc::clone(&balancer),
            Arc::clone(&detector),
            FailoverConfig {
                enabled: config.failover.enabled,
                max_retries: config.failover.max_retries,
            },
        ));

        let app_state = AppState::new(resolver, failover, Arc::clone(&detector), providers, config.http.upstream_timeout);

        let router = handler::router(app_state).layer(tower_http::trace::TraceLayer::new_for_http());

        Self {
            router,
            listen_address: config.http.listen_address,
            cache,
            detector,
            _repository_marker: std::marker::PhantomData,
        }
    }

    /// Bind and serve until `shutdown` is cancelled. Background janitors are
    /// started here and stopped on the way out.
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let cache_janitor = Arc::clone(&self.cache).spawn_cleaner();
        let detector_janitor = Arc::clone(&self.detector).spawn_janitor();

        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        tracing::info!(address = %self.listen_address, "gateway listening");

        let shutdown_for_serve = shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown_for_serve.cancelled().await;
            })
            .await?;

        self.cache.close();
        self.detector.close();
        let _ = tokio::time::timeout(Duration::from_secs(5), cache_janitor).await;
        let _ = tokio::time::timeout(Duration::from_secs(5), detector_janitor).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_model::testing::InMemoryStore;

    #[tokio::test]
    async fn server_builds_from_default_config() {
        let config = GatewayConfig::default();
        let store = Arc::new(InMemoryStore::new());
        let server: Server<InMemoryStore, InMemoryStore> = Server::new(&config, Arc::clone(&store), store);
        assert_eq!(server.listen_address.port(), config.http.listen_address.port());
    }
}
