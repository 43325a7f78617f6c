//! Memoized text generation
//!
//! Caches [`TextGenerator`] output by (prompt, model, shape) in a bounded LRU
//! cache. Concurrent misses on the same key share one upstream call.
//! Failures are handed to every waiter and never stored, so the next call
//! retries.
//!
//! Eviction followed by regeneration can return different text for the
//! same prompt; callers must not assume repeatability.

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::sync::Arc;

use super::text_generator::{GenerationError, OutputShape, TextGenerator};

/// Default number of cached generations
pub const DEFAULT_CACHE_CAPACITY: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    prompt: String,
    model: String,
    shape: OutputShape,
}

/// LRU cache in front of a [`TextGenerator`]
pub struct GenerationCache {
    inner: Cache<CacheKey, String>,
    generator: Arc<TextGenerator>,
}

impl GenerationCache {
    pub fn new(generator: Arc<TextGenerator>, capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { inner, generator }
    }

    /// Cached text for (prompt, model, shape), generating on miss
    pub async fn get_or_generate(
        &self,
        prompt: &str,
        model: &str,
        shape: OutputShape,
    ) -> Result<String, GenerationError> {
        let key = CacheKey {
            prompt: prompt.to_string(),
            model: model.to_string(),
            shape,
        };

        if let Some(text) = self.inner.get(&key).await {
            tracing::debug!(model = %model, "Generation cache hit");
            return Ok(text);
        }

        self.inner
            .try_get_with(key, async {
                tracing::debug!(model = %model, "Generation cache miss");
                self.generator.generate(prompt, model, shape).await
            })
            .await
            .map_err(|e| {
                tracing::warn!(model = %model, error = %e, "Generation failed; result not cached");
                (*e).clone()
            })
    }

    /// Approximate entry count (exact after [`Self::run_pending_tasks`])
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Apply pending evictions and bookkeeping
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::text_generator::GenerationBackend;
    use crate::services::text_generator::OutputShape::{List, Text};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` calls, then echoes the prompt
    struct FlakyBackend {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl GenerationBackend for FlakyBackend {
        async fn complete(&self, prompt: &str, _model: &str) -> Result<String, GenerationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            if n < self.failures {
                Err(GenerationError::Network("connection refused".to_string()))
            } else {
                Ok(format!("echo: {}", prompt.lines().next().unwrap_or_default()))
            }
        }
    }

    fn cache_with(failures: usize, capacity: u64) -> (Arc<FlakyBackend>, GenerationCache) {
        let backend = Arc::new(FlakyBackend {
            calls: AtomicUsize::new(0),
            failures,
        });
        let generator = Arc::new(TextGenerator::new(backend.clone(), 8));
        (backend, GenerationCache::new(generator, capacity))
    }

    #[tokio::test]
    async fn test_hit_skips_upstream() {
        let (backend, cache) = cache_with(0, 10);

        let first = cache.get_or_generate("Describe stars", "m", Text).await.unwrap();
        let second = cache.get_or_generate("Describe stars", "m", Text).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_is_part_of_key() {
        let (backend, cache) = cache_with(0, 10);

        cache.get_or_generate("Describe stars", "a", Text).await.unwrap();
        cache.get_or_generate("Describe stars", "b", Text).await.unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let (backend, cache) = cache_with(1, 10);

        let first = cache.get_or_generate("Describe stars", "m", Text).await;
        assert!(matches!(first, Err(GenerationError::Network(_))));

        let second = cache.get_or_generate("Describe stars", "m", Text).await.unwrap();
        assert_eq!(second, "echo: Describe stars");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_collapse() {
        let (backend, cache) = cache_with(0, 10);
        let cache = Arc::new(cache);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_or_generate("Describe stars", "m", Text).await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "echo: Describe stars");
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capacity_bounded() {
        let (backend, cache) = cache_with(0, 2);

        for prompt in ["one", "two", "three", "four"] {
            cache.get_or_generate(prompt, "m", Text).await.unwrap();
        }
        cache.run_pending_tasks().await;

        assert!(cache.entry_count() <= 2, "entry_count = {}", cache.entry_count());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_eviction_is_least_recently_used() {
        let (backend, cache) = cache_with(0, 2);
        let calls = || backend.calls.load(Ordering::SeqCst);

        cache.get_or_generate("oldest", "m", Text).await.unwrap();
        cache.run_pending_tasks().await;
        cache.get_or_generate("newer", "m", Text).await.unwrap();
        cache.run_pending_tasks().await;

        // Touch the oldest entry so "newer" becomes least recently used
        cache.get_or_generate("oldest", "m", Text).await.unwrap();
        cache.run_pending_tasks().await;
        assert_eq!(calls(), 2);

        cache.get_or_generate("newest", "m", Text).await.unwrap();
        cache.run_pending_tasks().await;
        assert_eq!(calls(), 3);

        cache.get_or_generate("oldest", "m", Text).await.unwrap();
        assert_eq!(calls(), 3, "touched entry must survive eviction");

        cache.get_or_generate("newer", "m", Text).await.unwrap();
        assert_eq!(calls(), 4, "untouched entry must be evicted");
    }

    #[tokio::test]
    async fn test_shape_is_part_of_key() {
        let (backend, cache) = cache_with(0, 10);

        let text = cache.get_or_generate("Describe stars", "m", Text).await.unwrap();
        let list = cache.get_or_generate("Describe stars", "m", List).await.unwrap();

        assert_eq!(text, "echo: Describe stars");
        assert_eq!(list, "['echo: Describe stars']");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
