//! The forensic per-image descriptor tree.
//!
//! One `UltraDetailedDescriptor` is owned 1:1 by a `PortfolioImage`. Every
//! leaf is optional: a vision-model response that omits a field becomes
//! `None`, never a fabricated default. `completeness_percentage` walks the
//! tree counting how many of the declared leaves are populated.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gender presentation as read from the image, not the subject's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPresentation {
    Feminine,
    Masculine,
    Androgynous,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    #[serde(default)]
    pub one_sentence_description: Option<String>,
    #[serde(default)]
    pub dominant_aesthetic: Option<String>,
    #[serde(default)]
    pub key_garments: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Silhouette {
    #[serde(default)]
    pub overall_shape: Option<String>,
    #[serde(default)]
    pub fit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fabric {
    #[serde(default)]
    pub primary_material: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub drape: Option<String>,
    #[serde(default)]
    pub finish: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorSwatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub coverage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Construction {
    #[serde(default)]
    pub seams: Option<String>,
    #[serde(default)]
    pub stitching: Option<String>,
    #[serde(default)]
    pub closures: Option<String>,
    #[serde(default)]
    pub hardware: Option<String>,
}

/// One garment entry. Index 0 within `garments[]` is the primary garment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Garment {
    #[serde(default)]
    pub garment_type: Option<String>,
    #[serde(default)]
    pub silhouette: Silhouette,
    #[serde(default)]
    pub fabric: Fabric,
    #[serde(default)]
    pub color_palette: Vec<ColorSwatch>,
    #[serde(default)]
    pub construction: Construction,
    #[serde(default)]
    pub sleeve_length: Option<String>,
    #[serde(default)]
    pub collar: Option<String>,
    #[serde(default)]
    pub length: Option<String>,
    /// Per-garment confidence as reported by the vision model, if any.
    /// Used to compute `overall_confidence` and to gate signature pieces.
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDemographics {
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub body_type: Option<String>,
    #[serde(default)]
    pub proportions: Option<String>,
    #[serde(default)]
    pub gender_presentation: Option<GenderPresentation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShotComposition {
    #[serde(default)]
    pub shot_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub gaze: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub body_position: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lighting {
    #[serde(default)]
    pub lighting_type: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraAngle {
    #[serde(default)]
    pub horizontal: Option<String>,
    #[serde(default)]
    pub vertical: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub background_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Photography {
    #[serde(default)]
    pub shot_composition: ShotComposition,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub lighting: Lighting,
    #[serde(default)]
    pub camera_angle: CameraAngle,
    #[serde(default)]
    pub background: Background,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StylingContext {
    #[serde(default)]
    pub accessories: Option<Vec<String>>,
    #[serde(default)]
    pub styling_approach: Option<String>,
    #[serde(default)]
    pub overall_aesthetic: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextualAttributes {
    #[serde(default)]
    pub mood_aesthetic: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorMetadata {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub prompt_version: Option<String>,
    #[serde(default)]
    pub uncertain_details: Vec<String>,
    #[serde(default)]
    pub raw_elapsed_ms: Option<u64>,
}

/// The full forensic analysis of one portfolio image.
///
/// Invariants (enforced by `clamp_quality` before persisting, never by
/// rejecting the descriptor): `0 <= overall_confidence <= 1`,
/// `0 <= completeness_percentage <= 100`. At least one garment is required
/// for a descriptor to be considered complete; an empty `garments` vec can
/// only occur transiently while parsing a malformed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UltraDetailedDescriptor {
    pub id: Uuid,
    pub image_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub executive_summary: ExecutiveSummary,
    pub garments: Vec<Garment>,
    #[serde(default)]
    pub model_demographics: ModelDemographics,
    #[serde(default)]
    pub photography: Photography,
    #[serde(default)]
    pub styling_context: StylingContext,
    #[serde(default)]
    pub contextual_attributes: ContextualAttributes,
    #[serde(default)]
    pub metadata: DescriptorMetadata,
    pub overall_confidence: f64,
    pub completeness_percentage: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl UltraDetailedDescriptor {
    /// Clamp the two quality metrics to their declared bounds. Called
    /// unconditionally before persisting; never rejects the descriptor.
    pub fn clamp_quality(&mut self) {
        self.overall_confidence = self.overall_confidence.clamp(0.0, 1.0);
        self.completeness_percentage = self.completeness_percentage.clamp(0.0, 100.0);
    }

    /// `true` when this descriptor fell below either quality floor and
    /// should be written to the quality-review sink.
    pub fn is_low_quality(&self) -> bool {
        self.overall_confidence < 0.70 || self.completeness_percentage < 70.0
    }

    /// The combined score used by the extractor's retry policy to pick the
    /// better of two attempts: `confidence * completeness / 100`.
    pub fn retry_score(&self) -> f64 {
        self.overall_confidence * (self.completeness_percentage / 100.0)
    }

    /// The primary garment, i.e. index 0 of `garments`.
    pub fn primary_garment(&self) -> Option<&Garment> {
        self.garments.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_descriptor() -> UltraDetailedDescriptor {
        UltraDetailedDescriptor {
            id: Uuid::new_v4(),
            image_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            executive_summary: ExecutiveSummary::default(),
            garments: vec![Garment::default()],
            model_demographics: ModelDemographics::default(),
            photography: Photography::default(),
            styling_context: StylingContext::default(),
            contextual_attributes: ContextualAttributes::default(),
            metadata: DescriptorMetadata::default(),
            overall_confidence: 0.5,
            completeness_percentage: 50.0,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn clamp_quality_bounds_overflowing_values() {
        let mut d = blank_descriptor();
        d.overall_confidence = 15.5;
        d.completeness_percentage = 1200.75;
        d.clamp_quality();
        assert_eq!(d.overall_confidence, 1.0);
        assert_eq!(d.completeness_percentage, 100.0);
    }

    #[test]
    fn clamp_quality_bounds_negative_values() {
        let mut d = blank_descriptor();
        d.overall_confidence = -0.3;
        d.completeness_percentage = -10.0;
        d.clamp_quality();
        assert_eq!(d.overall_confidence, 0.0);
        assert_eq!(d.completeness_percentage, 0.0);
    }

    #[test]
    fn is_low_quality_flags_below_either_floor() {
        let mut d = blank_descriptor();
        d.overall_confidence = 0.69;
        d.completeness_percentage = 90.0;
        assert!(d.is_low_quality());

        d.overall_confidence = 0.9;
        d.completeness_percentage = 69.9;
        assert!(d.is_low_quality());

        d.overall_confidence = 0.7;
        d.completeness_percentage = 70.0;
        assert!(!d.is_low_quality());
    }

    #[test]
    fn retry_score_matches_scenario_3_values() {
        let mut first = blank_descriptor();
        first.overall_confidence = 0.55;
        first.completeness_percentage = 100.0;

        let mut second = blank_descriptor();
        second.overall_confidence = 0.82;
        second.completeness_percentage = 100.0;

        assert!(second.retry_score() > first.retry_score());
    }
}
