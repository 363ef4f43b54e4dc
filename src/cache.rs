use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Keyed cache with time-based eviction.
///
/// Entries expire `ttl` after insertion; expired entries are replaced on the
/// next `get_or_compute` for their key.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key` when fresh, otherwise run `compute`
    /// and cache its result for `ttl`.
    ///
    /// A failed `compute` leaves the cache untouched.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: K,
        ttl: Duration,
        compute: F,
    ) -> anyhow::Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&key)
                && entry.inserted_at.elapsed() < ttl
            {
                return Ok(entry.value.clone());
            }
        }

        let value = compute().await?;

        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                inserted_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Insert a value directly, restarting its TTL window.
    pub async fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Fresh-entry lookup without computing.
    pub async fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < ttl)
            .map(|entry| entry.value.clone())
    }

    /// Drop every expired entry.
    pub async fn evict_expired(&self, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn second_call_within_ttl_hits_cache() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let computed = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let computed = Arc::clone(&computed);
            let value = cache
                .get_or_compute("key".to_string(), Duration::from_secs(60), move || {
                    async move {
                        computed.fetch_add(1, Ordering::SeqCst);
                        Ok(7)
                    }
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_ttl_always_recomputes() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let computed = Arc::new(AtomicU32::new(0));

        for expected in 1..=2 {
            let counter = Arc::clone(&computed);
            cache
                .get_or_compute("key".to_string(), Duration::ZERO, move || {
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(0)
                    }
                })
                .await
                .unwrap();
            assert_eq!(computed.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let cache: TtlCache<String, u32> = TtlCache::new();

        let result = cache
            .get_or_compute("key".to_string(), Duration::from_secs(60), || async {
                anyhow::bail!("backend down")
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);

        let value = cache
            .get_or_compute("key".to_string(), Duration::from_secs(60), || async {
                Ok(3)
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let cache: TtlCache<(Vec<String>, i64), u32> = TtlCache::new();
        let ttl = Duration::from_secs(60);

        let a = cache
            .get_or_compute((vec!["srs".into()], 3), ttl, || async { Ok(1) })
            .await
            .unwrap();
        let b = cache
            .get_or_compute((vec!["sow".into()], 3), ttl, || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(cache.len().await, 2);
    }
}
