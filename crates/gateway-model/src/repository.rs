use async_trait::async_trait;

use crate::{Mapping, Provider, UnifiedModel};

/// Narrow read interface onto the admin-owned store of unified models and
/// mappings. The resolver never sees a connection pool, a schema, or a
/// query language — only this trait.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Look up a `UnifiedModel` by its unique name.
    async fn find_unified_model(&self, name: &str) -> Result<Option<UnifiedModel>, RepositoryError>;

    /// List every mapping for a unified model, eager-joined with its
    /// provider. Disabled mappings and disabled/unhealthy providers are
    /// included here; the resolver is responsible for filtering them.
    async fn list_mappings(&self, unified_model_id: i64) -> Result<Vec<Mapping>, RepositoryError>;
}

/// Narrow read interface onto the admin-owned provider store, used once a
/// candidate has been selected and the gateway needs the full record
/// (decrypted API key included) to forward the request.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn find_provider(&self, id: i64) -> Result<Option<Provider>, RepositoryError>;
}

/// Opaque failure from a collaborator. The core treats any repository
/// failure as an internal router error; it never inspects the cause.
#[derive(Debug, thiserror::Error)]
#[error("repository error: {0}")]
pub struct RepositoryError(pub String);
