//! Process-wide, 60s-TTL, lock-guarded read-through name resolver cache
//! (spec.md §5), shaped like a `RateLimiterState`: an `Arc`-shared map
//! keyed by a request dimension, pruned lazily on read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::clients::NameResolver;
use crate::error::Result;

const DEFAULT_TTL: Duration = Duration::from_secs(60);

struct CachedRecord {
    value: Option<String>,
    fetched_at: Instant,
}

/// Wraps an inner resolver (ENS, Stellar federation, whatever the
/// deployment binds) with a TTL cache so repeated `resolveTextRecord`
/// calls for the same `(name,key)` don't hit the network every tick.
pub struct CachingNameResolver<R: NameResolver> {
    inner: R,
    ttl: Duration,
    cache: Arc<RwLock<HashMap<(String, String), CachedRecord>>>,
}

impl<R: NameResolver> CachingNameResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, ttl: DEFAULT_TTL, cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn with_ttl(inner: R, ttl: Duration) -> Self {
        Self { inner, ttl, cache: Arc::new(RwLock::new(HashMap::new())) }
    }
}

#[async_trait]
impl<R: NameResolver + Send + Sync> NameResolver for CachingNameResolver<R> {
    async fn resolve_text_record(&self, name: &str, key: &str) -> Result<Option<String>> {
        let cache_key = (name.to_string(), key.to_string());

        {
            let cache = self.cache.read().await;
            if let Some(record) = cache.get(&cache_key) {
                if record.fetched_at.elapsed() < self.ttl {
                    return Ok(record.value.clone());
                }
            }
        }

        let value = self.inner.resolve_text_record(name, key).await?;

        let mut cache = self.cache.write().await;
        cache.insert(cache_key, CachedRecord { value: value.clone(), fetched_at: Instant::now() });
        Ok(value)
    }
}

/// Resolves against a well-known text record HTTP endpoint, used for the
/// "Policy record (on-chain name resolver)" contract in spec.md §6.
#[derive(Clone)]
pub struct HttpNameResolver {
    base_url: String,
    http: reqwest::Client,
}

impl HttpNameResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl NameResolver for HttpNameResolver {
    async fn resolve_text_record(&self, name: &str, key: &str) -> Result<Option<String>> {
        let endpoint = format!("{}/resolve?name={}&key={}", self.base_url, name, key);
        let resp = self.http.get(&endpoint).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(crate::error::ChainError::Remote {
                endpoint,
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        #[derive(serde::Deserialize)]
        struct TextRecordResponse {
            value: Option<String>,
        }
        let body: TextRecordResponse = resp.json().await?;
        Ok(body.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NameResolver for CountingResolver {
        async fn resolve_text_record(&self, _name: &str, _key: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("cached-value".to_string()))
        }
    }

    #[tokio::test]
    async fn repeated_lookups_within_ttl_hit_cache_once() {
        let resolver = CachingNameResolver::with_ttl(
            CountingResolver { calls: AtomicUsize::new(0) },
            Duration::from_secs(60),
        );

        for _ in 0..5 {
            let value = resolver.resolve_text_record("treasury.eth", "dw-policy").await.unwrap();
            assert_eq!(value, Some("cached-value".to_string()));
        }

        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let resolver = CachingNameResolver::with_ttl(
            CountingResolver { calls: AtomicUsize::new(0) },
            Duration::from_millis(10),
        );

        resolver.resolve_text_record("treasury.eth", "dw-policy").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        resolver.resolve_text_record("treasury.eth", "dw-policy").await.unwrap();

        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 2);
    }
}
