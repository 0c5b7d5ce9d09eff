use crate::core::SemanticOracle;
use crate::models::CacheStats;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache. L2 is Redis, shared across instances,
/// and only present when a Redis URL is configured.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        let mut cache = Self::in_memory(l1_size, ttl_secs);
        cache.redis = Some(Arc::new(tokio::sync::Mutex::new(redis)));
        Ok(cache)
    }

    /// Create an L1-only cache manager
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            redis: None,
            l1_cache,
            ttl_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn has_l2(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.hits.fetch_add(1, Ordering::Relaxed);

                // Populate L1 cache
                self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            l2_enabled: self.has_l2(),
        }
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Key for a remote model reply to one (system, prompt) exchange
    ///
    /// Hex SHA-256 of both prompts, identical across builds and instances.
    pub fn oracle_reply(system_prompt: &str, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(system_prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(prompt.as_bytes());
        format!("oracle:{}", hex::encode(hasher.finalize()))
    }
}

/// Caches non-empty replies of any oracle
pub struct CachedOracle<O> {
    inner: O,
    cache: Arc<CacheManager>,
}

impl<O: SemanticOracle> CachedOracle<O> {
    pub fn new(inner: O, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<O: SemanticOracle> SemanticOracle for CachedOracle<O> {
    async fn ask(&self, prompt: &str, system_prompt: &str) -> String {
        let key = CacheKey::oracle_reply(system_prompt, prompt);

        match self.cache.get::<String>(&key).await {
            Ok(reply) => return reply,
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Reply cache read failed: {}", e),
        }

        let reply = self.inner.ask(prompt, system_prompt).await;
        if !reply.is_empty() {
            if let Err(e) = self.cache.set(&key, &reply).await {
                tracing::warn!("Reply cache write failed: {}", e);
            }
        }
        reply
    }
}
