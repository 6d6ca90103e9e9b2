//! The synthesized style profile and its derived Brand DNA.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized frequency distribution over one category (garments,
/// colors, fabrics, silhouettes). Values sum to 1.0 after the floor-and-
/// renormalize step in the synthesizer.
pub type Distribution = HashMap<String, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AestheticTheme {
    pub name: String,
    pub count: u32,
    pub strength: f64,
    pub frequency_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPattern {
    pub name: String,
    pub count: u32,
    pub frequency_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignaturePiece {
    pub garment_type: String,
    pub fabric: String,
    pub silhouette: String,
    pub confidence: f64,
}

/// Resolved gender-presentation setting driving the prompt builder's
/// model-gender token (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderSetting {
    Auto,
    Female,
    Male,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedGender {
    Feminine,
    Masculine,
    Androgynous,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelGenderPreference {
    pub setting: GenderSetting,
    pub detected_gender: Option<DetectedGender>,
    pub confidence: f64,
    pub manual_override: bool,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Default for ModelGenderPreference {
    fn default() -> Self {
        Self {
            setting: GenderSetting::Auto,
            detected_gender: None,
            confidence: 0.0,
            manual_override: false,
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Derived, in-memory-only summary of a user's signature aesthetic,
/// computed from a `StyleProfile` at prompt time. Never persisted
/// separately (§4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandDna {
    pub primary_aesthetic: Option<String>,
    pub secondary_aesthetic: Option<String>,
    pub signature_colors: Vec<String>,
    pub signature_fabrics: Vec<String>,
    pub signature_constructions: Vec<String>,
    pub photography_preferences: HashMap<String, String>,
    pub brand_strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub portfolio_id: Uuid,
    pub distributions: HashMap<String, Distribution>,
    pub aesthetic_themes: Vec<AestheticTheme>,
    pub construction_patterns: Vec<ConstructionPattern>,
    pub signature_pieces: Vec<SignaturePiece>,
    pub style_tags: Vec<String>,
    pub garment_types: Vec<String>,
    pub style_description: String,
    pub avg_confidence: f64,
    pub avg_completeness: f64,
    /// The modal value of each photography sub-structure (`shot_type`,
    /// `lighting_type`, `camera_angle_horizontal`, `camera_angle_vertical`,
    /// `background_type`) across the portfolio's descriptors. Feeds Brand
    /// DNA's `photography_preferences` (§4.3).
    pub photography_preferences: HashMap<String, String>,
    pub model_gender_preference: ModelGenderPreference,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StyleProfile {
    /// Clamp the two averaged quality metrics to their declared column
    /// bounds before persisting (§6.4: `DECIMAL(4,3)`-equivalent ranges).
    pub fn clamp_quality(&mut self) {
        self.avg_confidence = self.avg_confidence.clamp(0.0, 9.999);
        self.avg_completeness = self.avg_completeness.clamp(0.0, 999.99);
    }

    pub fn distribution(&self, category: &str) -> Option<&Distribution> {
        self.distributions.get(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_profile() -> StyleProfile {
        StyleProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            portfolio_id: Uuid::new_v4(),
            distributions: HashMap::new(),
            aesthetic_themes: Vec::new(),
            construction_patterns: Vec::new(),
            signature_pieces: Vec::new(),
            style_tags: Vec::new(),
            garment_types: Vec::new(),
            style_description: String::new(),
            avg_confidence: 0.0,
            avg_completeness: 0.0,
            photography_preferences: HashMap::new(),
            model_gender_preference: ModelGenderPreference::default(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn clamp_quality_matches_scenario_6_numeric_clamp() {
        let mut p = blank_profile();
        p.avg_confidence = 15.5;
        p.avg_completeness = 1200.75;
        p.clamp_quality();
        assert_eq!(p.avg_confidence, 9.999);
        assert_eq!(p.avg_completeness, 999.99);
    }
}
