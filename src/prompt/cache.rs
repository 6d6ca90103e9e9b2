//! Prompt-package LRU cache (§4.4, §5): in-process only, never shared
//! across replicas. Mirrors the teacher's `CacheHandler` shape
//! (`add`/`read`/`clear`/`len`) with capacity+TTL eviction on top.

use std::num::NonZeroUsize;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::types::PromptPackage;

struct Entry {
    package: PromptPackage,
    inserted_at: Instant,
}

pub struct PromptCache {
    inner: Mutex<LruCache<String, Entry>>,
    ttl: std::time::Duration,
}

impl PromptCache {
    pub fn new(capacity: usize, ttl: std::time::Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self { inner: Mutex::new(LruCache::new(capacity)), ttl }
    }

    pub fn read(&self, key: &str) -> Option<PromptPackage> {
        let mut guard = self.inner.lock();
        let expired = match guard.peek(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            guard.pop(key);
            return None;
        }
        guard.get(key).map(|entry| entry.package.clone())
    }

    pub fn add(&self, key: String, package: PromptPackage) {
        self.inner.lock().put(key, Entry { package, inserted_at: Instant::now() });
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `hash(user_id, garment_type, season, occasion, round(creativity,1),
/// brand_dna_flag, round(brand_dna_strength,1), variation_seed)` (§4.4).
#[allow(clippy::too_many_arguments)]
pub fn cache_key(
    user_id: Uuid,
    garment_type: Option<&str>,
    season: Option<&str>,
    occasion: Option<&str>,
    creativity: f64,
    enforce_brand_dna: bool,
    brand_dna_strength: f64,
    variation_seed: i64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(garment_type.unwrap_or("").as_bytes());
    hasher.update(season.unwrap_or("").as_bytes());
    hasher.update(occasion.unwrap_or("").as_bytes());
    hasher.update(format!("{:.1}", creativity).as_bytes());
    hasher.update([enforce_brand_dna as u8]);
    hasher.update(format!("{:.1}", brand_dna_strength).as_bytes());
    hasher.update(variation_seed.to_le_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChosenTokens, PromptMetadata};

    fn package() -> PromptPackage {
        PromptPackage {
            positive: "positive".to_string(),
            negative: "negative".to_string(),
            metadata: PromptMetadata {
                user_id: Uuid::new_v4(),
                creativity: 0.5,
                brand_dna_strength: 0.8,
                chosen: ChosenTokens::default(),
                brand_consistency_score: 0.0,
                variation_seed: 0,
                generation_index: 0,
                is_exploration: false,
            },
        }
    }

    #[test]
    fn add_then_read_returns_the_same_package() {
        let cache = PromptCache::new(4, std::time::Duration::from_secs(60));
        cache.add("key".to_string(), package());
        assert!(cache.read("key").is_some());
    }

    #[test]
    fn read_on_missing_key_is_none() {
        let cache = PromptCache::new(4, std::time::Duration::from_secs(60));
        assert!(cache.read("missing").is_none());
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let cache = PromptCache::new(4, std::time::Duration::from_millis(1));
        cache.add("key".to_string(), package());
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.read("key").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_key_is_stable_for_identical_inputs() {
        let user_id = Uuid::new_v4();
        let a = cache_key(user_id, Some("dress"), None, None, 0.55, true, 0.8, 3);
        let b = cache_key(user_id, Some("dress"), None, None, 0.549, true, 0.8, 3);
        assert_eq!(a, b);
    }
}
