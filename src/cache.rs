use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use lru::LruCache;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::debug;

/// Deterministic cache keys for derived views.
pub mod keys {
    pub fn ingredient_key(id: i64) -> String {
        format!("ingredient-{id}")
    }
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
    async fn delete(&self, key: &str);
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

type Store = Arc<RwLock<LruCache<String, Entry>>>;

/// Process-local LRU cache with per-entry expiry. Expired entries are dropped
/// on read and by the optional cleanup task; the least recently used entry
/// makes room once `capacity` is reached.
#[derive(Clone)]
pub struct InMemoryCache {
    store: Store,
}

impl InMemoryCache {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// A capacity of 0 falls back to 1000 entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Periodically removes expired entries. Must be called inside a tokio runtime.
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                Self::remove_expired(&store).await;
            }
        })
    }

    async fn remove_expired(store: &Store) -> usize {
        let mut guard = store.write().await;
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            guard.pop(key);
        }
        drop(guard);
        if !expired.is_empty() {
            debug!(removed = expired.len(), "expired cache entries removed");
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        // LruCache::get updates recency, so this needs the write lock
        let mut store = self.store.write().await;
        let expired = match store.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            store.pop(key);
        }
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.store.write().await.push(key.to_string(), entry);
    }

    async fn delete(&self, key: &str) {
        self.store.write().await.pop(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_key_is_stable() {
        assert_eq!(keys::ingredient_key(42), "ingredient-42");
    }

    #[tokio::test]
    async fn set_get_delete() {
        let cache = InMemoryCache::new(10);
        cache.set("k", "v".into(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn expired_entries_miss_and_are_dropped() {
        let cache = InMemoryCache::new(10);
        cache.set("k", "v".into(), Duration::ZERO).await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_noop() {
        let cache = InMemoryCache::new(10);
        cache.delete("nothing-here").await;
        assert_eq!(cache.get("nothing-here").await, None);
    }

    #[tokio::test]
    async fn size_is_bounded_by_capacity() {
        let cache = InMemoryCache::new(100);
        for id in 0..10_000 {
            cache
                .set(&keys::ingredient_key(id), "x".into(), Duration::ZERO)
                .await;
        }
        assert_eq!(cache.len().await, 100);
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let cache = InMemoryCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", "1".into(), ttl).await;
        cache.set("b", "2".into(), ttl).await;
        assert!(cache.get("a").await.is_some());
        cache.set("c", "3".into(), ttl).await;

        assert!(cache.get("a").await.is_some());
        assert_eq!(cache.get("b").await, None);
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn cleanup_removes_expired_entries_without_reads() {
        let cache = InMemoryCache::new(100);
        cache.set("old", "x".into(), Duration::ZERO).await;
        cache.set("fresh", "y".into(), Duration::from_secs(60)).await;

        assert_eq!(InMemoryCache::remove_expired(&cache.store).await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn cleanup_task_runs_in_background() {
        let cache = InMemoryCache::new(100);
        cache.set("old", "x".into(), Duration::ZERO).await;
        let handle = cache.spawn_cleanup(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert_eq!(cache.len().await, 0);
    }
}
