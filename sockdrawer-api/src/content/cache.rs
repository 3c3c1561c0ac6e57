//! Time-limited, size-bounded cache in front of a content source
//!
//! Only successful fetches are cached; an account that was unavailable or a
//! source that failed is asked again next time. Entries expire after the TTL
//! and the least recently used entry is evicted once the cache is full.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{ContentError, ContentSource};
use crate::identifiers::Identifier;

struct Entry {
    fetched_at: Instant,
    posts: Vec<String>,
}

/// Caches recent posts per `(identifier, limit)` for a fixed time-to-live
pub struct CachedContentSource {
    inner: Arc<dyn ContentSource>,
    ttl: Duration,
    entries: Mutex<LruCache<(Identifier, usize), Entry>>,
}

impl CachedContentSource {
    /// * `ttl` - how long a fetched post list is served from the cache
    /// * `capacity` - most `(identifier, limit)` entries kept at once
    pub fn new(inner: Arc<dyn ContentSource>, ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached entries, expired ones included until looked up again
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl ContentSource for CachedContentSource {
    async fn recent_posts(
        &self,
        id: &Identifier,
        limit: usize,
    ) -> Result<Vec<String>, ContentError> {
        let key = (id.clone(), limit);

        {
            let mut entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    tracing::debug!(id = %id, "Content cache hit");
                    return Ok(entry.posts.clone());
                }
                // Expired
                entries.pop(&key);
            }
        }

        // Lock is not held across the fetch
        let posts = self.inner.recent_posts(id, limit).await?;

        self.entries.lock().await.put(
            key,
            Entry {
                fetched_at: Instant::now(),
                posts: posts.clone(),
            },
        );

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentSource for CountingSource {
        async fn recent_posts(
            &self,
            id: &Identifier,
            _limit: usize,
        ) -> Result<Vec<String>, ContentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match id {
                Identifier::Handle(name) if name == "private" => {
                    Err(ContentError::Unavailable(name.clone()))
                }
                _ => Ok(vec![format!("post by {}", id)]),
            }
        }
    }

    const CAPACITY: NonZeroUsize = match NonZeroUsize::new(16) {
        Some(n) => n,
        None => panic!("zero capacity"),
    };

    fn counting() -> Arc<CountingSource> {
        Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_second_fetch_is_cached() {
        let inner = counting();
        let cache = CachedContentSource::new(inner.clone(), Duration::from_secs(60), CAPACITY);
        let id = Identifier::Handle("JesseT_G".to_string());

        let first = cache.recent_posts(&id, 20).await.unwrap();
        let second = cache.recent_posts(&id, 20).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let inner = counting();
        let cache = CachedContentSource::new(inner.clone(), Duration::from_millis(20), CAPACITY);
        let id = Identifier::Numeric(2048);

        cache.recent_posts(&id, 20).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.recent_posts(&id, 20).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = counting();
        let cache = CachedContentSource::new(inner.clone(), Duration::from_secs(60), CAPACITY);
        let id = Identifier::Handle("private".to_string());

        assert!(cache.recent_posts(&id, 20).await.is_err());
        assert!(cache.recent_posts(&id, 20).await.is_err());

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_least_recently_used_evicted_at_capacity() {
        let inner = counting();
        let capacity = NonZeroUsize::new(2).unwrap();
        let cache = CachedContentSource::new(inner.clone(), Duration::from_secs(60), capacity);
        let first = Identifier::Numeric(1);
        let second = Identifier::Numeric(2);
        let third = Identifier::Numeric(3);

        cache.recent_posts(&first, 20).await.unwrap();
        cache.recent_posts(&second, 20).await.unwrap();
        // Touch the first so the second becomes least recently used
        cache.recent_posts(&first, 20).await.unwrap();
        cache.recent_posts(&third, 20).await.unwrap();
        assert_eq!(cache.entry_count().await, 2);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);

        cache.recent_posts(&first, 20).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        cache.recent_posts(&second, 20).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_many_distinct_ids_stay_bounded() {
        let inner = counting();
        let cache = CachedContentSource::new(inner.clone(), Duration::from_secs(259_200), CAPACITY);

        for i in 0..1_000 {
            cache.recent_posts(&Identifier::Numeric(i), 20).await.unwrap();
        }

        assert_eq!(cache.entry_count().await, CAPACITY.get());
    }
}
