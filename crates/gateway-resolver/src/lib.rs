//! The mapping resolver (component B): resolves a unified model name to an
//! ordered, filtered list of candidates, through the routing cache.

mod error;

pub use error::ResolverError;

use std::sync::Arc;

use gateway_cache::RoutingCache;
use gateway_model::{HealthStatus, ModelRepository, ResolvedCandidate};

/// Configuration governing candidate filtering and ordering.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub health_check_enabled: bool,
    pub weight_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            health_check_enabled: true,
            weight_enabled: true,
        }
    }
}

/// Resolves unified model names to candidate lists. Never itself selects one
/// candidate — that is the balancer/executor's job.
pub struct MappingResolver<R: ModelRepository> {
    repository: Arc<R>,
    cache: Arc<RoutingCache>,
    config: ResolverConfig,
}

impl<R: ModelRepository> MappingResolver<R> {
    pub const fn new(repository: Arc<R>, cache: Arc<RoutingCache>, config: ResolverConfig) -> Self {
        Self { repository, cache, config }
    }

    /// Resolve `model_name` to an ordered candidate list.
    #[tracing::instrument(skip(self), fields(model = %model_name))]
    pub async fn resolve(&self, model_name: &str) -> Result<Vec<ResolvedCandidate>, ResolverError> {
        let trimmed = model_name.trim();
        if trimmed.is_empty() {
            return Err(ResolverError::ModelNotFound { model: model_name.to_owned() });
        }

        if let Some(cached) = self.cache.get(trimmed) {
            return Ok(cached);
        }

        let unified_model = self
            .repository
            .find_unified_model(trimmed)
            .await
            .map_err(|e| ResolverError::RouterInternal(e.to_string()))?
            .ok_or_else(|| ResolverError::ModelNotFound { model: trimmed.to_owned() })?;

        let mappings = self
            .repository
            .list_mappings(unified_model.id)
            .await
            .map_err(|e| ResolverError::RouterInternal(e.to_string()))?;

        let mut candidates: Vec<ResolvedCandidate> = mappings
            .iter()
            .filter(|mapping| mapping.enabled)
            .filter(|mapping| {
                if !self.config.health_check_enabled {
                    return true;
                }
                mapping.provider.enabled && !unhealthy(mapping.provider.health_status)
            })
            .map(ResolvedCandidate::from)
            .collect();

        if candidates.is_empty() {
            return Err(ResolverError::NoAvailableProviders { model: trimmed.to_owned() });
        }

        let weight_enabled = self.config.weight_enabled;
        candidates.sort_by(|a, b| {
            a.priority.cmp(&b.priority).then_with(|| {
                if weight_enabled {
                    b.weight.cmp(&a.weight)
                } else {
                    a.mapping_id.cmp(&b.mapping_id)
                }
            })
        });

        self.cache.set(trimmed, &candidates);
        Ok(candidates)
    }
}

const fn unhealthy(status: HealthStatus) -> bool {
    status.is_unhealthy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_cache::CacheConfig;
    use gateway_model::testing::InMemoryStore;
    use gateway_model::{Mapping, Provider, UnifiedModel};
    use secrecy::SecretString;

    fn provider(id: i64, enabled: bool, health: HealthStatus) -> Provider {
        Provider {
            id,
            name: format!("provider-{id}"),
            base_url: "https://example.com".to_owned(),
            api_key: SecretString::from("sk-test"),
            enabled,
            health_status: health,
            probe_model: None,
        }
    }

    fn setup() -> (MappingResolver<InMemoryStore>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(RoutingCache::new(CacheConfig::default()));
        let resolver = MappingResolver::new(store.clone(), cache, ResolverConfig::default());
        (resolver, store)
    }

    #[tokio::test]
    async fn empty_name_is_model_not_found() {
        let (resolver, _) = setup();
        let err = resolver.resolve("   ").await.unwrap_err();
        assert!(matches!(err, ResolverError::ModelNotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_model_is_model_not_found() {
        let (resolver, _) = setup();
        let err = resolver.resolve("gpt-5").await.unwrap_err();
        assert!(matches!(err, ResolverError::ModelNotFound { .. }));
    }

    #[tokio::test]
    async fn disabled_and_unhealthy_mappings_are_filtered() {
        let (resolver, store) = setup();
        store.insert_unified_model(UnifiedModel {
            id: 1,
            name: "gpt-5".to_owned(),
            display_name: None,
            description: None,
        });
        store.insert_mapping(Mapping {
            id: 1,
            unified_model_id: 1,
            provider: provider(1, true, HealthStatus::Healthy),
            weight: 10,
            priority: 1,
            enabled: false,
            target_model: "real-model".to_owned(),
        });
        store.insert_mapping(Mapping {
            id: 2,
            unified_model_id: 1,
            provider: provider(2, true, HealthStatus::Unhealthy),
            weight: 10,
            priority: 1,
            enabled: true,
            target_model: "real-model".to_owned(),
        });

        let err = resolver.resolve("gpt-5").await.unwrap_err();
        assert!(matches!(err, ResolverError::NoAvailableProviders { .. }));
    }

    #[tokio::test]
    async fn sorts_by_priority_then_weight_descending() {
        let (resolver, store) = setup();
        store.insert_unified_model(UnifiedModel {
            id: 1,
            name: "gpt-5".to_owned(),
            display_name: None,
            description: None,
        });
        store.insert_mapping(Mapping {
            id: 1,
            unified_model_id: 1,
            provider: provider(1, true, HealthStatus::Healthy),
            weight: 10,
            priority: 2,
            enabled: true,
            target_model: "m1".to_owned(),
        });
        store.insert_mapping(Mapping {
            id: 2,
            unified_model_id: 1,
            provider: provider(2, true, HealthStatus::Healthy),
            weight: 90,
            priority: 1,
            enabled: true,
            target_model: "m2".to_owned(),
        });
        store.insert_mapping(Mapping {
            id: 3,
            unified_model_id: 1,
            provider: provider(3, true, HealthStatus::Healthy),
            weight: 10,
            priority: 1,
            enabled: true,
            target_model: "m3".to_owned(),
        });

        let candidates = resolver.resolve("gpt-5").await.unwrap();
        let ids: Vec<i64> = candidates.iter().map(|c| c.mapping_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn health_probe_string_marks_provider_unhealthy() {
        let (resolver, store) = setup();
        store.insert_unified_model(UnifiedModel {
            id: 1,
            name: "gpt-5".to_owned(),
            display_name: None,
            description: None,
        });
        store.insert_mapping(Mapping {
            id: 1,
            unified_model_id: 1,
            provider: provider(1, true, HealthStatus::Healthy),
            weight: 10,
            priority: 1,
            enabled: true,
            target_model: "real-model".to_owned(),
        });

        // A health-probing collaborator reports back a raw string, not an
        // already-typed `HealthStatus`.
        store.set_provider_health(1, "TIMEOUT");

        let err = resolver.resolve("gpt-5").await.unwrap_err();
        assert!(matches!(err, ResolverError::NoAvailableProviders { .. }));
    }

    #[tokio::test]
    async fn second_resolve_is_served_from_cache() {
        let (resolver, store) = setup();
        store.insert_unified_model(UnifiedModel {
            id: 1,
            name: "gpt-5".to_owned(),
            display_name: None,
            description: None,
        });
        store.insert_mapping(Mapping {
            id: 1,
            unified_model_id: 1,
            provider: provider(1, true, HealthStatus::Healthy),
            weight: 10,
            priority: 1,
            enabled: true,
            target_model: "m1".to_owned(),
        });

        let first = resolver.resolve("gpt-5").await.unwrap();
        // Mutate the store after the first resolve; a cache hit must still
        // return the originally resolved list.
        store.insert_mapping(Mapping {
            id: 2,
            unified_model_id: 1,
            provider: provider(2, true, HealthStatus::Healthy),
            weight: 50,
            priority: 1,
            enabled: true,
            target_model: "m2".to_owned(),
        });
        let second = resolver.resolve("gpt-5").await.unwrap();
        assert_eq!(first.len(), second.len());
    }
}
