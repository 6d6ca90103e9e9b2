//! Append-only feedback events and the fixed reward table (§4.7).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::generation::CandidateSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Save,
    Share,
    GenerateSimilar,
    Dislike,
    Delete,
    Like,
    View,
}

impl FeedbackType {
    /// Fixed reward for this feedback type (§4.7). `view` additionally
    /// depends on `time_viewed_ms`, applied by the caller before this
    /// value is used.
    pub fn base_reward(&self) -> f64 {
        match self {
            FeedbackType::GenerateSimilar => 1.5,
            FeedbackType::Share => 1.2,
            FeedbackType::Save | FeedbackType::Like => 1.0,
            FeedbackType::View => 0.2,
            FeedbackType::Dislike => -0.5,
            FeedbackType::Delete => -1.0,
        }
    }
}

/// Resolved reward for a feedback event, accounting for `view`'s
/// time-viewed threshold (must be >= 3000ms to earn its reward).
pub fn resolve_reward(feedback_type: FeedbackType, time_viewed_ms: Option<u64>) -> f64 {
    if feedback_type == FeedbackType::View {
        if time_viewed_ms.unwrap_or(0) >= 3000 {
            feedback_type.base_reward()
        } else {
            0.0
        }
    } else {
        feedback_type.base_reward()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_id: Uuid,
    pub generation_id: Uuid,
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    /// `category -> [token, ...]`, copied verbatim from the prompt
    /// metadata's `chosen` map so feedback never needs a second parse of
    /// the positive prompt.
    pub tokens_used: CandidateSet,
    pub time_viewed_ms: Option<u64>,
    pub reward: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl FeedbackEvent {
    /// Stable idempotency key: `(user, image, type, tokens_used)`. Two
    /// submissions within the 5-second dedup window sharing this key are
    /// treated as the same event.
    pub fn idempotency_key(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut tokens: Vec<(&String, &Vec<String>)> = self.tokens_used.iter().collect();
        tokens.sort_by(|a, b| a.0.cmp(b.0));
        let serialized = serde_json::to_string(&tokens).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(self.user_id.as_bytes());
        hasher.update(self.image_id.as_bytes());
        hasher.update(format!("{:?}", self.feedback_type).as_bytes());
        hasher.update(serialized.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_reward_applies_view_time_threshold() {
        assert_eq!(resolve_reward(FeedbackType::View, Some(3000)), 0.2);
        assert_eq!(resolve_reward(FeedbackType::View, Some(2999)), 0.0);
        assert_eq!(resolve_reward(FeedbackType::View, None), 0.0);
    }

    #[test]
    fn resolve_reward_matches_fixed_table() {
        assert_eq!(resolve_reward(FeedbackType::GenerateSimilar, None), 1.5);
        assert_eq!(resolve_reward(FeedbackType::Share, None), 1.2);
        assert_eq!(resolve_reward(FeedbackType::Save, None), 1.0);
        assert_eq!(resolve_reward(FeedbackType::Like, None), 1.0);
        assert_eq!(resolve_reward(FeedbackType::Dislike, None), -0.5);
        assert_eq!(resolve_reward(FeedbackType::Delete, None), -1.0);
    }

    #[test]
    fn idempotency_key_is_stable_for_identical_payloads() {
        let mut tokens_used = HashMap::new();
        tokens_used.insert("lighting".to_string(), vec!["cinematic lighting".to_string()]);

        let base = FeedbackEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            image_id: Uuid::new_v4(),
            generation_id: Uuid::new_v4(),
            feedback_type: FeedbackType::Save,
            tokens_used,
            time_viewed_ms: None,
            reward: 1.0,
            created_at: chrono::Utc::now(),
        };

        let mut duplicate = base.clone();
        duplicate.id = Uuid::new_v4();
        duplicate.generation_id = base.generation_id;

        assert_eq!(base.idempotency_key(), duplicate.idempotency_key());
    }
}
