use super::{Aggregator, UnifiedStatus};
use crate::{
    cache::{Cache, DEFAULT_TTL},
    directory::DirectorySource,
    duo::MfaSource,
    error::ResolveError,
};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Cache-aside wrapper around the [`Aggregator`].
///
/// Only successful resolves are cached. Cache failures are logged and behave
/// like a miss, so they never fail a request.
pub struct StatusService<M, D> {
    aggregator: Aggregator<M, D>,
    cache: Cache,
    ttl: Duration,
    key_prefix: String,
}

impl<M, D> StatusService<M, D>
where
    M: MfaSource,
    D: DirectorySource,
{
    pub fn new(aggregator: Aggregator<M, D>, cache: Cache) -> Self {
        Self {
            aggregator,
            cache,
            ttl: DEFAULT_TTL,
            key_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Cache key for `username`; the bare username unless a prefix is configured.
    #[must_use]
    pub fn cache_key(&self, username: &str) -> String {
        if self.key_prefix.is_empty() {
            username.to_string()
        } else {
            format!("{}:{username}", self.key_prefix)
        }
    }

    /// # Errors
    /// Propagates the [`ResolveError`] of a failed resolve; nothing is cached then.
    #[instrument(skip(self))]
    pub async fn status(&self, username: &str) -> Result<UnifiedStatus, ResolveError> {
        let key = self.cache_key(username);

        if let Some(status) = self.cached(&key).await {
            debug!("cache hit");
            return Ok(status);
        }

        let status = self.aggregator.resolve(username).await?;

        match serde_json::to_string(&status) {
            Ok(encoded) => {
                if let Err(e) = self.cache.set(&key, encoded, self.ttl).await {
                    warn!("Failed to cache status for {}: {}", username, e);
                }
            }
            Err(e) => warn!("Failed to encode status for {}: {}", username, e),
        }

        Ok(status)
    }

    async fn cached(&self, key: &str) -> Option<UnifiedStatus> {
        let encoded = match self.cache.get(key).await {
            Ok(encoded) => encoded?,
            Err(e) => {
                warn!("Cache read failed: {}", e);
                return None;
            }
        };

        serde_json::from_str(&encoded)
            .inspect_err(|e| warn!("Discarding undecodable cache entry {}: {}", key, e))
            .ok()
    }
}
