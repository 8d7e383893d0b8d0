use std::path::Path;

use crate::GatewayConfig;

impl GatewayConfig {
    /// Read `path`, expand `{{ env.VAR }}` placeholders, deserialize as TOML,
    /// then validate.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        tracing::info!(path = %path.display(), "loaded configuration");

        Ok(config)
    }

    /// Reject configurations that would make the rest of the gateway behave
    /// nonsensically: a zero-length cache TTL never expires anything given
    /// the cache's own `created_at` comparison, zero retries means no
    /// candidate is ever attempted, and so on.
    ///
    /// # Errors
    /// Returns an error naming the first invalid field found.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache.ttl.is_zero() {
            anyhow::bail!("cache.ttl must be greater than zero");
        }
        if self.cache.max_size == 0 {
            anyhow::bail!("cache.max_size must be greater than zero");
        }
        if self.failover.max_retries == 0 {
            anyhow::bail!("failover.max_retries must be greater than zero");
        }
        if self.detector.failure_threshold == 0 {
            anyhow::bail!("detector.failure_threshold must be greater than zero");
        }
        Ok(())
    }
}
