//! Weight Store (§4.7): persists per-`(user, category, token)` weights and
//! serves epsilon-greedy samples to callers; the Prompt Builder reads the
//! same Beta-posterior counts directly from `TokenWeightStore` for its own
//! Thompson-sampling selection.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::errors::StorageError;
use crate::store::{FeedbackLog, TokenWeightStore};
use crate::types::{resolve_reward, CandidateSet, FeedbackEvent, FeedbackType, TokenWeight};

/// One incoming feedback submission (§6.3 wire contract).
pub struct FeedbackPayload {
    pub user_id: Uuid,
    pub image_id: Uuid,
    pub generation_id: Uuid,
    pub feedback_type: FeedbackType,
    pub tokens_used: CandidateSet,
    pub time_viewed_ms: Option<u64>,
}

pub struct WeightStore<T: TokenWeightStore, F: FeedbackLog> {
    tokens: Arc<T>,
    feedback: Arc<F>,
    config: CoreConfig,
}

impl<T: TokenWeightStore, F: FeedbackLog> WeightStore<T, F> {
    pub fn new(tokens: Arc<T>, feedback: Arc<F>, config: CoreConfig) -> Self {
        Self { tokens, feedback, config }
    }

    pub async fn get_weights(
        &self,
        user_id: Uuid,
        category: Option<&str>,
    ) -> Result<Vec<TokenWeight>, StorageError> {
        self.tokens.get_all(user_id, category).await
    }

    /// With probability `ε` (or `1.0` when `explore_mode`), pick uniformly
    /// at random from `candidates`; otherwise return the top-`count` by
    /// learned weight, defaulting unseen tokens to weight `1.0`.
    pub async fn select_tokens(
        &self,
        user_id: Uuid,
        category: &str,
        candidates: &[String],
        count: usize,
        explore_mode: bool,
    ) -> Result<Vec<String>, StorageError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let epsilon = if explore_mode { 1.0 } else { self.config.weight_store_epsilon };
        if rand::thread_rng().gen_bool_clamped(epsilon) {
            let mut pool = candidates.to_vec();
            pool.shuffle(&mut rand::thread_rng());
            pool.truncate(count);
            return Ok(pool);
        }

        let weights = self.get_weights(user_id, Some(category)).await?;
        let weight_of = |token: &str| -> f64 {
            weights
                .iter()
                .find(|w| w.token == token)
                .map(|w| w.weight)
                .unwrap_or(1.0)
        };

        let mut ranked: Vec<&String> = candidates.iter().collect();
        ranked.sort_by(|a, b| {
            weight_of(b)
                .partial_cmp(&weight_of(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });
        ranked.truncate(count);
        Ok(ranked.into_iter().cloned().collect())
    }

    /// Apply the §4.7 update rule for every `(category, token)` pair in
    /// `tokens_used`. Idempotent: a duplicate `(user, image, type,
    /// tokens_used)` submission within the configured dedup window is a
    /// no-op.
    pub async fn process_feedback(&self, payload: FeedbackPayload) -> Result<(), StorageError> {
        let reward = resolve_reward(payload.feedback_type, payload.time_viewed_ms);

        let event = FeedbackEvent {
            id: Uuid::new_v4(),
            user_id: payload.user_id,
            image_id: payload.image_id,
            generation_id: payload.generation_id,
            feedback_type: payload.feedback_type,
            tokens_used: payload.tokens_used,
            time_viewed_ms: payload.time_viewed_ms,
            reward,
            created_at: chrono::Utc::now(),
        };

        let key = event.idempotency_key();
        if self
            .feedback
            .recent_duplicate(&key, self.config.feedback_dedup_window)
            .await?
            .is_some()
        {
            return Ok(());
        }

        for (category, tokens) in &event.tokens_used {
            for token in tokens {
                let mut weight = self
                    .tokens
                    .get(event.user_id, category, token)
                    .await?
                    .unwrap_or_else(|| TokenWeight::new(event.user_id, category.clone(), token.clone()));
                weight.apply_reward(reward, self.config.weight_learning_rate);
                self.tokens.put(&weight).await?;
            }
        }

        self.feedback.append(&event).await
    }
}

/// Small extension so `select_tokens`'s epsilon-roll reads as a statement
/// rather than a bare `gen_bool` call with an un-named float.
trait BoolRoll {
    fn gen_bool_clamped(&mut self, p: f64) -> bool;
}

impl<R: rand::Rng + ?Sized> BoolRoll for R {
    fn gen_bool_clamped(&mut self, p: f64) -> bool {
        self.gen_bool(p.clamp(0.0, 1.0))
    }
}
