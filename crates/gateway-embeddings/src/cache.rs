// Embedding cache: wraps an EmbeddingProvider with a process-local LRU
// keyed by the SHA-256 of the normalized input text (see SPEC_FULL.md's
// resolution of the embedding-cache open question: process-local, not a
// shared store, since the cache is a latency optimization, not a
// correctness dependency).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use gateway_core::traits::{EmbeddingError, EmbeddingOutcome, EmbeddingProvider};
use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::client::HttpEmbeddingClient;

pub struct CachedEmbeddingClient<P> {
    inner: P,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl<P: EmbeddingProvider> CachedEmbeddingClient<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cache_key(text: &str) -> String {
        let normalized = HttpEmbeddingClient::normalize(text);
        let digest = Sha256::digest(normalized.as_bytes());
        hex::encode(digest)
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbeddingClient<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_with_meta(text).await?.vector)
    }

    async fn embed_with_meta(&self, text: &str) -> Result<EmbeddingOutcome, EmbeddingError> {
        let key = Self::cache_key(text);

        if let Some(hit) = self.cache.lock().unwrap().get(&key).cloned() {
            metrics::counter!("embedding_cache_hits_total").increment(1);
            return Ok(EmbeddingOutcome {
                vector: hit,
                cache_hit: true,
            });
        }

        metrics::counter!("embedding_cache_misses_total").increment(1);
        let vector = self.inner.embed(text).await?;
        self.cache.lock().unwrap().put(key, vector.clone());
        Ok(EmbeddingOutcome {
            vector,
            cache_hit: false,
        })
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    #[tokio::test]
    async fn repeated_calls_for_same_text_hit_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedEmbeddingClient::new(
            CountingProvider {
                calls: calls.clone(),
            },
            16,
        );

        cached.embed("restart the pod").await.unwrap();
        cached.embed("restart the pod").await.unwrap();
        cached.embed("restart   the pod").await.unwrap(); // normalizes the same

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_text_bypasses_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedEmbeddingClient::new(
            CountingProvider {
                calls: calls.clone(),
            },
            16,
        );

        cached.embed("restart the pod").await.unwrap();
        cached.embed("scale the deployment").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
