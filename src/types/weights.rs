//! Per-user, per-category, per-token learned weights (§3, §4.7).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The six token categories the prompt builder and weight store share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenCategory {
    Lighting,
    Composition,
    Style,
    Quality,
    Mood,
    ModelPose,
}

impl TokenCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenCategory::Lighting => "lighting",
            TokenCategory::Composition => "composition",
            TokenCategory::Style => "style",
            TokenCategory::Quality => "quality",
            TokenCategory::Mood => "mood",
            TokenCategory::ModelPose => "modelPose",
        }
    }
}

/// A learned `(user, category, token)` weight. Lazily created at weight
/// 1.0 on first reference; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenWeight {
    pub user_id: Uuid,
    pub category: String,
    pub token: String,
    pub weight: f64,
    pub usage_count: u64,
    pub positive_feedback: u64,
    pub negative_feedback: u64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl TokenWeight {
    pub fn new(user_id: Uuid, category: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id,
            category: category.into(),
            token: token.into(),
            weight: 1.0,
            usage_count: 0,
            positive_feedback: 0,
            negative_feedback: 0,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Beta posterior shape parameters the Thompson sampler draws from:
    /// `alpha = 1 + positive_feedback`, `beta = 1 + negative_feedback`.
    pub fn beta_params(&self) -> (f64, f64) {
        (
            1.0 + self.positive_feedback as f64,
            1.0 + self.negative_feedback as f64,
        )
    }

    /// Weight normalized into `[0,1]` for the Thompson-sampling score term.
    pub fn normalized(&self) -> f64 {
        self.weight / 2.0
    }

    /// Apply one reward observation under the §4.7 update rule.
    pub fn apply_reward(&mut self, reward: f64, learning_rate: f64) {
        self.weight = (self.weight + learning_rate * (reward - self.weight)).clamp(0.0, 2.0);
        if reward > 0.0 {
            self.positive_feedback += 1;
        } else {
            self.negative_feedback += 1;
        }
        self.usage_count += 1;
        self.updated_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_reward_matches_scenario_4_sequence() {
        let user_id = Uuid::new_v4();
        let mut w = TokenWeight::new(user_id, "lighting", "cinematic lighting");

        w.apply_reward(1.0, 0.1); // save
        assert!((w.weight - 1.0).abs() < 1e-9);
        assert_eq!(w.positive_feedback, 1);
        assert_eq!(w.usage_count, 1);

        w.apply_reward(1.5, 0.1); // generate_similar
        assert!((w.weight - 1.05).abs() < 1e-9);

        w.apply_reward(-0.5, 0.1); // dislike
        assert!((w.weight - 0.895).abs() < 1e-9);
        assert_eq!(w.negative_feedback, 1);
        assert_eq!(w.usage_count, 3);
    }

    #[test]
    fn apply_reward_clamps_to_bounds() {
        let user_id = Uuid::new_v4();
        let mut w = TokenWeight::new(user_id, "style", "token");
        for _ in 0..100 {
            w.apply_reward(1.5, 0.5);
        }
        assert!(w.weight <= 2.0);

        let mut w2 = TokenWeight::new(user_id, "style", "token2");
        for _ in 0..100 {
            w2.apply_reward(-1.0, 0.5);
        }
        assert!(w2.weight >= 0.0);
    }
}
