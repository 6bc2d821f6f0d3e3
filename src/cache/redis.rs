use super::CacheError;
use fred::{
    error::{Error, ErrorKind},
    prelude::*,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Redis backend over TCP (`redis://`, `rediss://`) or a unix socket.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

/// Normalize a configured target into a URL `fred` understands.
fn redis_url(target: &str) -> String {
    if target.starts_with('/') {
        format!("redis+unix://{target}")
    } else {
        target.to_string()
    }
}

#[allow(clippy::needless_pass_by_value)]
fn from_redis_error(err: Error) -> CacheError {
    match err.kind() {
        ErrorKind::IO | ErrorKind::Timeout => CacheError::Connection(err.to_string()),
        ErrorKind::Config => CacheError::Configuration(err.to_string()),
        _ => CacheError::Internal(err.to_string()),
    }
}

/// Whole seconds for `EX`: at least one, saturating at `i64::MAX`.
fn expiry_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX)
}

impl RedisCache {
    /// # Errors
    /// Returns an error if the target is not a valid Redis URL or the server is unreachable.
    pub async fn connect(target: &str) -> Result<Self, CacheError> {
        let config = Config::from_url(&redis_url(target))
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        let client = Client::new(
            config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        client.init().await.map_err(from_redis_error)?;

        info!("Connected to Redis cache");

        Ok(Self { client })
    }

    /// # Errors
    /// Returns an error if the command fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self.client.get(key).await.map_err(from_redis_error)?;
        debug!(hit = value.is_some(), "redis GET");

        Ok(value)
    }

    /// `SET key value EX ttl`; expiry is enforced by the server.
    ///
    /// # Errors
    /// Returns an error if the command fails.
    pub async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let seconds = expiry_seconds(ttl);

        self.client
            .set::<(), _, _>(key, value, Some(Expiration::EX(seconds)), None, false)
            .await
            .map_err(from_redis_error)
    }

    pub async fn quit(&self) {
        if let Err(e) = self.client.quit().await {
            warn!("Failed to close Redis connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_paths_become_unix_urls() {
        assert_eq!(
            redis_url("/run/redis/redis.sock"),
            "redis+unix:///run/redis/redis.sock"
        );
    }

    #[test]
    fn urls_pass_through() {
        assert_eq!(redis_url("redis://cache:6379/2"), "redis://cache:6379/2");
        assert_eq!(redis_url("rediss://cache:6380"), "rediss://cache:6380");
    }

    #[test]
    fn expiry_is_positive_and_saturates() {
        assert_eq!(expiry_seconds(Duration::ZERO), 1);
        assert_eq!(expiry_seconds(Duration::from_millis(1500)), 1);
        assert_eq!(expiry_seconds(Duration::from_secs(300)), 300);
        assert_eq!(expiry_seconds(Duration::from_secs(u64::MAX)), i64::MAX);
    }

    #[test]
    fn io_errors_map_to_connection() {
        let err = from_redis_error(Error::new(ErrorKind::IO, "connection refused"));
        assert!(matches!(err, CacheError::Connection(_)));

        let err = from_redis_error(Error::new(ErrorKind::Config, "bad url"));
        assert!(matches!(err, CacheError::Configuration(_)));
    }

    #[tokio::test]
    async fn invalid_url_is_configuration_error() {
        let result = RedisCache::connect("not a url").await;
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }
}
