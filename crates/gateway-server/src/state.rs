use std::sync::Arc;
use std::time::Duration;

use gateway_detector::FailureDetector;
use gateway_failover::FailoverExecutor;
use gateway_model::ProviderDirectory;
use gateway_resolver::MappingResolver;

/// Everything a request handler needs. Cheap to clone: every field is
/// already an `Arc` or a handle to one.
pub struct AppState<R: gateway_model::ModelRepository, P: ProviderDirectory> {
    pub resolver: Arc<MappingResolver<R>>,
    pub failover: Arc<FailoverExecutor>,
    pub detector: Arc<FailureDetector>,
    pub providers: Arc<P>,
    pub http_client: reqwest::Client,
}

impl<R: gateway_model::ModelRepository, P: ProviderDirectory> Clone for AppState<R, P> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            failover: Arc::clone(&self.failover),
            detector: Arc::clone(&self.detector),
            providers: Arc::clone(&self.providers),
            http_client: self.http_client.clone(),
        }
    }
}

impl<R: gateway_model::ModelRepository, P: ProviderDirectory> AppState<R, P> {
    #[must_use]
    pub fn new(
        resolver: Arc<MappingResolver<R>>,
        failover: Arc<FailoverExecutor>,
        detector: Arc<FailureDetector>,
        providers: Arc<P>,
        upstream_timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(upstream_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { resolver, failover, detector, providers, http_client }
    }
}
