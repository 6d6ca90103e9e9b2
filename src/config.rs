//! Runtime configuration. Every "default N, configurable" knob named in
//! the specification is read from an environment variable with the
//! documented default, following `utilities/paths.rs`'s
//! `env::var(...).unwrap_or_else(...)` idiom.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Bounded concurrency for per-portfolio image analysis (§4.1, §5).
    /// Default 3, hard cap 10 regardless of the env override.
    pub extraction_concurrency: usize,
    /// Retry backoff base for network errors (§4.1): base 500ms, factor 2,
    /// max 3 attempts.
    pub backoff_base: Duration,
    pub backoff_factor: u32,
    pub backoff_max_attempts: u32,
    /// Prompt-builder LRU cache capacity and TTL (§4.4).
    pub prompt_cache_capacity: usize,
    pub prompt_cache_ttl: Duration,
    /// Weight-store epsilon-greedy exploration rate (§4.7).
    pub weight_store_epsilon: f64,
    /// Weight-store feedback learning rate (§4.7).
    pub weight_learning_rate: f64,
    /// Feedback idempotency dedup window (§4.7).
    pub feedback_dedup_window: Duration,
    /// Suspension-point timeouts (§5).
    pub vision_timeout: Duration,
    pub generator_timeout: Duration,
    pub db_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            extraction_concurrency: env_usize("STYLE_CORE_EXTRACTION_CONCURRENCY", 3).min(10),
            backoff_base: Duration::from_millis(env_u64("STYLE_CORE_BACKOFF_BASE_MS", 500)),
            backoff_factor: env_u32("STYLE_CORE_BACKOFF_FACTOR", 2),
            backoff_max_attempts: env_u32("STYLE_CORE_BACKOFF_MAX_ATTEMPTS", 3),
            prompt_cache_capacity: env_usize("STYLE_CORE_PROMPT_CACHE_CAPACITY", 1024),
            prompt_cache_ttl: Duration::from_secs(env_u64("STYLE_CORE_PROMPT_CACHE_TTL_SECS", 600)),
            weight_store_epsilon: env_f64("STYLE_CORE_WEIGHT_EPSILON", 0.15),
            weight_learning_rate: env_f64("STYLE_CORE_WEIGHT_LEARNING_RATE", 0.1),
            feedback_dedup_window: Duration::from_secs(env_u64(
                "STYLE_CORE_FEEDBACK_DEDUP_SECS",
                5,
            )),
            vision_timeout: Duration::from_secs(env_u64("STYLE_CORE_VISION_TIMEOUT_SECS", 60)),
            generator_timeout: Duration::from_secs(env_u64(
                "STYLE_CORE_GENERATOR_TIMEOUT_SECS",
                180,
            )),
            db_timeout: Duration::from_secs(env_u64("STYLE_CORE_DB_TIMEOUT_SECS", 10)),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_specification() {
        // SAFETY: tests run single-threaded per-module in this crate's
        // suite and none of these keys are set in the test environment.
        let cfg = CoreConfig::default();
        assert_eq!(cfg.extraction_concurrency, 3);
        assert_eq!(cfg.backoff_base, Duration::from_millis(500));
        assert_eq!(cfg.backoff_factor, 2);
        assert_eq!(cfg.backoff_max_attempts, 3);
        assert_eq!(cfg.prompt_cache_capacity, 1024);
        assert_eq!(cfg.prompt_cache_ttl, Duration::from_secs(600));
        assert_eq!(cfg.weight_store_epsilon, 0.15);
        assert_eq!(cfg.weight_learning_rate, 0.1);
    }

    #[test]
    fn extraction_concurrency_is_capped_at_ten_even_if_overridden_higher() {
        env::set_var("STYLE_CORE_EXTRACTION_CONCURRENCY", "25");
        let cfg = CoreConfig::default();
        assert_eq!(cfg.extraction_concurrency, 10);
        env::remove_var("STYLE_CORE_EXTRACTION_CONCURRENCY");
    }
}
