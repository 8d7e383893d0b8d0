//! The gateway's data model and the narrow collaborator interfaces the core
//! consumes instead of owning.
//!
//! `UnifiedModel`, `Provider`, and `Mapping` are the shapes an external admin
//! layer (CRUD surfaces, a real database, encryption-at-rest for API keys)
//! would persist. This crate defines only the shapes and the traits a
//! resolver needs to read them; it does not implement a schema, a migration
//! tool, or an admin surface.

mod repository;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use repository::{ModelRepository, ProviderDirectory};

use secrecy::SecretString;

/// Caller-facing model alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedModel {
    pub id: i64,
    /// Unique, printable, at most 100 characters.
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// Health status of an upstream provider, as last observed by an (external)
/// health-probing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Parse the loosely-typed string health status the admin store hands
    /// back. Case-insensitive; anything not recognized as unhealthy is
    /// treated as healthy, per the resolver's filtering rule.
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        match lowered.as_str() {
            "unhealthy" | "error" | "failed" | "timeout" => Self::Unhealthy,
            "" => Self::Unknown,
            _ => Self::Healthy,
        }
    }

    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }
}

/// An upstream API endpoint.
#[derive(Debug, Clone)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    /// Scheme + host, no trailing slash, no API path.
    pub base_url: String,
    pub api_key: SecretString,
    pub enabled: bool,
    pub health_status: HealthStatus,
    pub probe_model: Option<String>,
}

/// A point-in-time snapshot of a `Provider`, free of its secret, embedded in
/// a `ResolvedCandidate`. Cloning a candidate list never clones a live
/// connection or a live secret reference beyond this value copy.
#[derive(Debug, Clone)]
pub struct ProviderSnapshot {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub enabled: bool,
    pub health_status: HealthStatus,
}

impl From<&Provider> for ProviderSnapshot {
    fn from(provider: &Provider) -> Self {
        Self {
            id: provider.id,
            name: provider.name.clone(),
            base_url: provider.base_url.clone(),
            enabled: provider.enabled,
            health_status: provider.health_status,
        }
    }
}

/// An edge connecting one `UnifiedModel` to one `Provider` with a concrete
/// target model string.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub id: i64,
    pub unified_model_id: i64,
    pub provider: Provider,
    /// Weight in `[1,100]`.
    pub weight: u32,
    /// Priority, smaller is preferred. `[1, inf)`.
    pub priority: u32,
    pub enabled: bool,
    pub target_model: String,
}

/// In-memory projection of a `Mapping` joined to its `Provider`, used by the
/// selection path. Carries no reference back to the mapping or provider it
/// was built from.
#[derive(Debug, Clone)]
pub struct ResolvedCandidate {
    pub mapping_id: i64,
    pub provider_id: i64,
    pub target_model: String,
    pub weight: u32,
    pub priority: u32,
    pub enabled: bool,
    pub provider: ProviderSnapshot,
}

impl From<&Mapping> for ResolvedCandidate {
    fn from(mapping: &Mapping) -> Self {
        Self {
            mapping_id: mapping.id,
            provider_id: mapping.provider.id,
            target_model: mapping.target_model.clone(),
            weight: mapping.weight,
            priority: mapping.priority,
            enabled: mapping.enabled,
            provider: ProviderSnapshot::from(&mapping.provider),
        }
    }
}
