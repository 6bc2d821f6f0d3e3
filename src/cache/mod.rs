//! Cache-aside storage for serialized status records.

mod memory;
mod redis;

pub use self::{memory::MemoryCache, redis::RedisCache};

use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Shortest TTL ever written; anything below is rounded up.
pub const MIN_TTL: Duration = Duration::from_secs(1);

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Longest TTL ever written (one week); anything above is rounded down.
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache configuration error: {0}")]
    Configuration(String),
    #[error("cache error: {0}")]
    Internal(String),
}

/// Configured cache backend.
#[derive(Clone, Debug, Default)]
pub enum Cache {
    /// No backend: every lookup is a miss, every write is dropped.
    #[default]
    Disabled,
    Memory(MemoryCache),
    Redis(RedisCache),
}

impl Cache {
    /// Build the backend described by `target`.
    ///
    /// `None` or an empty string disables caching, `memory` selects the
    /// in-process store, anything else is treated as a Redis URL or unix socket path.
    ///
    /// # Errors
    /// Returns an error if the Redis backend cannot be configured or reached.
    pub async fn connect(target: Option<&str>) -> Result<Self, CacheError> {
        match target.map(str::trim) {
            None | Some("") => {
                info!("Cache disabled");
                Ok(Self::Disabled)
            }
            Some("memory") => {
                info!("Using in-memory cache");
                Ok(Self::Memory(MemoryCache::default()))
            }
            Some(target) => Ok(Self::Redis(RedisCache::connect(target).await?)),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }

    /// # Errors
    /// Returns an error if the backend cannot be read.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            Self::Disabled => Ok(None),
            Self::Memory(cache) => Ok(cache.get(key)),
            Self::Redis(cache) => cache.get(key).await,
        }
    }

    /// Store `value` under `key` for `ttl`, clamped to [`MIN_TTL`]..=[`MAX_TTL`].
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    pub async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let ttl = ttl.clamp(MIN_TTL, MAX_TTL);
        match self {
            Self::Disabled => Ok(()),
            Self::Memory(cache) => {
                cache.set(key, value, ttl);
                Ok(())
            }
            Self::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    /// Close backend connections.
    pub async fn quit(&self) {
        if let Self::Redis(cache) = self {
            cache.quit().await;
        }
    }
}
