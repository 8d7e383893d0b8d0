//! An in-memory `ModelRepository`/`ProviderDirectory` for tests and local
//! demos. Not a production persistence layer: it has no durability, no
//! migrations, and no concurrency control beyond a single mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Mapping, Provider, RepositoryError, UnifiedModel};

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    unified_models: HashMap<String, UnifiedModel>,
    mappings_by_model_id: HashMap<i64, Vec<Mapping>>,
    providers: HashMap<i64, Provider>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_unified_model(&self, model: UnifiedModel) {
        self.inner.lock().unwrap().unified_models.insert(model.name.clone(), model);
    }

    pub fn insert_mapping(&self, mapping: Mapping) {
        let mut inner = self.inner.lock().unwrap();
        inner.providers.insert(mapping.provider.id, mapping.provider.clone());
        inner
            .mappings_by_model_id
            .entry(mapping.unified_model_id)
            .or_default()
            .push(mapping);
    }

    /// Update a provider's health status from the loosely-typed string a
    /// health-probing collaborator reports (e.g. `"healthy"`, `"timeout"`).
    /// No-op if the provider is not present.
    pub fn set_provider_health(&self, provider_id: i64, raw: &str) {
        let status = crate::HealthStatus::from_str_loose(raw);
        if let Some(provider) = self.inner.lock().unwrap().providers.get_mut(&provider_id) {
            provider.health_status = status;
        }
        for mappings in self.inner.lock().unwrap().mappings_by_model_id.values_mut() {
            for mapping in mappings.iter_mut() {
                if mapping.provider.id == provider_id {
                    mapping.provider.health_status = status;
                }
            }
        }
    }
}

#[async_trait]
impl crate::ModelRepository for InMemoryStore {
    async fn find_unified_model(&self, name: &str) -> Result<Option<UnifiedModel>, RepositoryError> {
        Ok(self.inner.lock().unwrap().unified_models.get(name).cloned())
    }

    async fn list_mappings(&self, unified_model_id: i64) -> Result<Vec<Mapping>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .mappings_by_model_id
            .get(&unified_model_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl crate::ProviderDirectory for InMemoryStore {
    async fn find_provider(&self, id: i64) -> Result<Option<Provider>, RepositoryError> {
        Ok(self.inner.lock().unwrap().providers.get(&id).cloned())
    }
}
