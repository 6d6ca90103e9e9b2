//! Profile Synthesizer (§4.2): aggregates a portfolio's descriptors into
//! one `StyleProfile`. Consolidates what the source repo implemented
//! twice (`trendAnalysisAgent` and `improvedTrendAnalysisAgent`) into one
//! path, per the Design Notes' Open Question resolution.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::{ProfileIncomplete, StorageError};
use crate::store::{DescriptorStore, StyleProfileStore};
use crate::types::{
    AestheticTheme, ConstructionPattern, DetectedGender, Distribution, Garment,
    GenderPresentation, ModelGenderPreference, PortfolioImage, SignaturePiece, StyleProfile,
    UltraDetailedDescriptor,
};

use super::alias::normalize;

const DISTRIBUTION_FLOOR: f64 = 0.01;
const MAX_TOP_ITEMS: usize = 10;
const SIGNATURE_CONFIDENCE_FLOOR: f64 = 0.85;
const GENDER_DOMINANCE_THRESHOLD: f64 = 0.60;
const GENDER_TIE_GAP: f64 = 0.15;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Incomplete(#[from] ProfileIncomplete),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct ProfileSynthesizer<D: DescriptorStore, P: StyleProfileStore> {
    descriptors: Arc<D>,
    profiles: Arc<P>,
}

impl<D: DescriptorStore, P: StyleProfileStore> ProfileSynthesizer<D, P> {
    pub fn new(descriptors: Arc<D>, profiles: Arc<P>) -> Self {
        Self { descriptors, profiles }
    }

    /// `synthesize(user_id, portfolio_id) -> StyleProfile`. Idempotent:
    /// replaces the profile keyed by `user_id`.
    pub async fn synthesize(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        images: &[PortfolioImage],
    ) -> Result<StyleProfile, SynthesisError> {
        let descriptors = self.descriptors.list_for_portfolio(portfolio_id, images).await?;
        if descriptors.is_empty() {
            return Err(ProfileIncomplete { portfolio_id }.into());
        }

        let existing = self.profiles.get(user_id).await?;

        let mut profile = synthesize_from_descriptors(user_id, portfolio_id, &descriptors, existing.as_ref());
        profile.clamp_quality();

        self.profiles.upsert(&profile).await?;
        Ok(profile)
    }
}

fn synthesize_from_descriptors(
    user_id: Uuid,
    portfolio_id: Uuid,
    descriptors: &[UltraDetailedDescriptor],
    existing: Option<&StyleProfile>,
) -> StyleProfile {
    let total = descriptors.len();

    let mut distributions = HashMap::new();
    distributions.insert("garments".to_string(), distribution_of(descriptors, |g| g.garment_type.clone()));
    distributions.insert(
        "colors".to_string(),
        distribution_of_many(descriptors, |g| g.color_palette.iter().filter_map(|c| c.name.clone()).collect()),
    );
    distributions.insert("fabrics".to_string(), distribution_of(descriptors, |g| g.fabric.primary_material.clone()));
    distributions.insert(
        "silhouettes".to_string(),
        distribution_of(descriptors, |g| g.silhouette.overall_shape.clone()),
    );

    let aesthetic_themes = aesthetic_themes_of(descriptors, total);
    let construction_patterns = construction_patterns_of(descriptors);
    let signature_pieces = signature_pieces_of(descriptors);
    let photography_preferences = photography_preferences_of(descriptors);

    let style_tags = aesthetic_themes.iter().map(|t| t.name.clone()).collect::<Vec<_>>();
    let garment_types = distinct_garment_types(descriptors);

    let avg_confidence = mean(descriptors.iter().map(|d| d.overall_confidence));
    let avg_completeness = mean(descriptors.iter().map(|d| d.completeness_percentage));

    let style_description = style_description_of(
        &aesthetic_themes,
        &garment_types,
        &construction_patterns,
        total,
        avg_confidence,
    );

    let model_gender_preference = update_gender_preference(descriptors, existing);

    // Brand DNA (§4.3) is derived from this profile at prompt time, not
    // stored on it, so nothing here computes it.
    StyleProfile {
        id: existing.map(|p| p.id).unwrap_or_else(Uuid::new_v4),
        user_id,
        portfolio_id,
        distributions,
        aesthetic_themes,
        construction_patterns,
        signature_pieces,
        style_tags,
        garment_types,
        style_description,
        avg_confidence,
        avg_completeness,
        photography_preferences,
        model_gender_preference,
        updated_at: chrono::Utc::now(),
    }
}

fn distribution_of(descriptors: &[UltraDetailedDescriptor], extract: impl Fn(&Garment) -> Option<String>) -> Distribution {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for descriptor in descriptors {
        for garment in &descriptor.garments {
            if let Some(raw) = extract(garment) {
                *counts.entry(normalize(&raw)).or_insert(0) += 1;
            }
        }
    }
    floor_and_renormalize(counts)
}

fn distribution_of_many(
    descriptors: &[UltraDetailedDescriptor],
    extract: impl Fn(&Garment) -> Vec<String>,
) -> Distribution {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for descriptor in descriptors {
        for garment in &descriptor.garments {
            for raw in extract(garment) {
                *counts.entry(normalize(&raw)).or_insert(0) += 1;
            }
        }
    }
    floor_and_renormalize(counts)
}

fn floor_and_renormalize(counts: HashMap<String, u64>) -> Distribution {
    let total: u64 = counts.values().sum();
    if total == 0 {
        return Distribution::new();
    }
    let mut dist: Distribution = counts
        .into_iter()
        .map(|(k, v)| (k, v as f64 / total as f64))
        .filter(|(_, freq)| *freq >= DISTRIBUTION_FLOOR)
        .collect();

    let sum: f64 = dist.values().sum();
    if sum > 0.0 {
        for value in dist.values_mut() {
            *value /= sum;
        }
    }
    dist
}

fn aesthetic_themes_of(descriptors: &[UltraDetailedDescriptor], total: usize) -> Vec<AestheticTheme> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for descriptor in descriptors {
        let mut seen_in_this_descriptor = std::collections::HashSet::new();
        for raw in [
            descriptor.executive_summary.dominant_aesthetic.clone(),
            descriptor.styling_context.overall_aesthetic.clone(),
        ]
        .into_iter()
        .flatten()
        {
            let name = normalize(&raw);
            if seen_in_this_descriptor.insert(name.clone()) {
                *counts.entry(name).or_insert(0) += 1;
            }
        }
    }

    let mut themes: Vec<AestheticTheme> = counts
        .into_iter()
        .map(|(name, count)| {
            let strength = if total > 0 { count as f64 / total as f64 } else { 0.0 };
            AestheticTheme {
                name,
                count,
                strength,
                frequency_label: format!("{:.0}%", strength * 100.0),
            }
        })
        .collect();

    themes.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal).then(a.name.cmp(&b.name)));
    themes.truncate(MAX_TOP_ITEMS);
    themes
}

fn construction_patterns_of(descriptors: &[UltraDetailedDescriptor]) -> Vec<ConstructionPattern> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for descriptor in descriptors {
        for garment in &descriptor.garments {
            for raw in [
                garment.fabric.primary_material.clone(),
                garment.construction.stitching.clone(),
                garment.silhouette.overall_shape.clone(),
            ]
            .into_iter()
            .flatten()
            {
                *counts.entry(normalize(&raw)).or_insert(0) += 1;
            }
        }
    }

    let mut patterns: Vec<ConstructionPattern> = counts
        .into_iter()
        .map(|(name, count)| ConstructionPattern {
            name,
            count,
            frequency_label: format!("{count}"),
        })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));
    patterns.truncate(MAX_TOP_ITEMS);
    patterns
}

fn signature_pieces_of(descriptors: &[UltraDetailedDescriptor]) -> Vec<SignaturePiece> {
    let mut pieces: HashMap<(String, String, String), SignaturePiece> = HashMap::new();
    for descriptor in descriptors {
        if descriptor.overall_confidence < SIGNATURE_CONFIDENCE_FLOOR {
            continue;
        }
        let confidence = descriptor.overall_confidence;
        for garment in &descriptor.garments {
            let garment_type = garment.garment_type.clone().unwrap_or_default();
            let fabric = garment.fabric.primary_material.clone().unwrap_or_default();
            let silhouette = garment.silhouette.overall_shape.clone().unwrap_or_default();
            let key = (garment_type.clone(), fabric.clone(), silhouette.clone());

            let entry = pieces.entry(key).or_insert_with(|| SignaturePiece {
                garment_type,
                fabric,
                silhouette,
                confidence,
            });
            if confidence > entry.confidence {
                entry.confidence = confidence;
            }
        }
    }

    let mut out: Vec<SignaturePiece> = pieces.into_values().collect();
    out.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    out.truncate(MAX_TOP_ITEMS);
    out
}

/// The modal value of each photography sub-structure across a portfolio's
/// descriptors, feeding Brand DNA's `photography_preferences` (§4.3).
fn photography_preferences_of(descriptors: &[UltraDetailedDescriptor]) -> HashMap<String, String> {
    let fields: [(&str, fn(&UltraDetailedDescriptor) -> Option<String>); 5] = [
        ("shot_type", |d| d.photography.shot_composition.shot_type.clone()),
        ("lighting_type", |d| d.photography.lighting.lighting_type.clone()),
        ("camera_angle_horizontal", |d| d.photography.camera_angle.horizontal.clone()),
        ("camera_angle_vertical", |d| d.photography.camera_angle.vertical.clone()),
        ("background_type", |d| d.photography.background.background_type.clone()),
    ];

    let mut preferences = HashMap::new();
    for (key, extract) in fields {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for descriptor in descriptors {
            if let Some(raw) = extract(descriptor) {
                *counts.entry(normalize(&raw)).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(String, u32)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        if let Some((mode, _)) = ranked.into_iter().next() {
            preferences.insert(key.to_string(), mode);
        }
    }
    preferences
}

fn distinct_garment_types(descriptors: &[UltraDetailedDescriptor]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for descriptor in descriptors {
        for garment in &descriptor.garments {
            if let Some(t) = &garment.garment_type {
                let normalized = normalize(t);
                if seen.insert(normalized.clone()) {
                    out.push(normalized);
                }
            }
        }
    }
    out
}

fn style_description_of(
    themes: &[AestheticTheme],
    garment_types: &[String],
    constructions: &[ConstructionPattern],
    total_images: usize,
    avg_confidence: f64,
) -> String {
    let top_themes = themes.iter().take(3).map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ");
    let top_garments = garment_types.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
    let top_constructions = constructions.iter().take(3).map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ");

    format!(
        "Your style is characterized by {top_themes}. You frequently feature {top_garments} with {top_constructions} construction details. Your portfolio shows {total_images} images with {avg_confidence:.3} average confidence."
    )
}

fn update_gender_preference(
    descriptors: &[UltraDetailedDescriptor],
    existing: Option<&StyleProfile>,
) -> ModelGenderPreference {
    let mut feminine = 0u32;
    let mut masculine = 0u32;
    let mut androgynous = 0u32;

    for descriptor in descriptors {
        match descriptor.model_demographics.gender_presentation {
            Some(GenderPresentation::Feminine) => feminine += 1,
            Some(GenderPresentation::Masculine) => masculine += 1,
            Some(GenderPresentation::Androgynous) => androgynous += 1,
            None => {}
        }
    }

    let total = feminine + masculine + androgynous;
    let mut preference = existing.map(|p| p.model_gender_preference.clone()).unwrap_or_default();

    if total == 0 {
        preference.updated_at = chrono::Utc::now();
        return preference;
    }

    let proportions = [
        (DetectedGender::Feminine, feminine as f64 / total as f64),
        (DetectedGender::Masculine, masculine as f64 / total as f64),
        (DetectedGender::Androgynous, androgynous as f64 / total as f64),
    ];

    let mut sorted = proportions;
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let (top_gender, top_proportion) = sorted[0];
    let (_, second_proportion) = sorted[1];

    let detected = if top_proportion >= GENDER_DOMINANCE_THRESHOLD {
        top_gender
    } else if top_proportion - second_proportion < GENDER_TIE_GAP {
        DetectedGender::Both
    } else {
        top_gender
    };

    preference.detected_gender = Some(detected);
    preference.confidence = top_proportion;
    preference.updated_at = chrono::Utc::now();
    // manual_override locks `setting`, never `detected_gender` (§4.2 step 9).
    preference
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorSwatch, ContextualAttributes, DescriptorMetadata, ExecutiveSummary, Fabric, ModelDemographics, Photography, Silhouette, StylingContext};

    fn descriptor(
        garment_type: &str,
        fabric: &str,
        silhouette: &str,
        aesthetic: &str,
        confidence: f64,
        gender: Option<GenderPresentation>,
    ) -> UltraDetailedDescriptor {
        UltraDetailedDescriptor {
            id: Uuid::new_v4(),
            image_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            executive_summary: ExecutiveSummary {
                one_sentence_description: None,
                dominant_aesthetic: Some(aesthetic.to_string()),
                key_garments: None,
            },
            garments: vec![Garment {
                garment_type: Some(garment_type.to_string()),
                silhouette: Silhouette { overall_shape: Some(silhouette.to_string()), fit: None },
                fabric: Fabric { primary_material: Some(fabric.to_string()), weight: None, drape: None, finish: None },
                color_palette: vec![ColorSwatch { name: Some("navy blue".to_string()), hex: None, coverage: None }],
                construction: Default::default(),
                sleeve_length: None,
                collar: None,
                length: None,
                confidence: Some(confidence),
            }],
            model_demographics: ModelDemographics {
                ethnicity: None,
                body_type: None,
                proportions: None,
                gender_presentation: gender,
            },
            photography: Photography::default(),
            styling_context: StylingContext { accessories: None, styling_approach: None, overall_aesthetic: Some(aesthetic.to_string()) },
            contextual_attributes: ContextualAttributes::default(),
            metadata: DescriptorMetadata::default(),
            overall_confidence: confidence,
            completeness_percentage: 80.0,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn color_distribution_coalesces_aliases_and_sums_to_one() {
        let descriptors = vec![
            descriptor("blazer", "wool", "boxy", "minimalist", 0.9, Some(GenderPresentation::Feminine)),
            descriptor("blazer", "wool", "boxy", "minimalist", 0.9, Some(GenderPresentation::Feminine)),
        ];
        let dist = distribution_of_many(&descriptors, |g| g.color_palette.iter().filter_map(|c| c.name.clone()).collect());
        assert_eq!(dist.len(), 1);
        assert!((dist["navy"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn signature_pieces_filters_below_confidence_floor_and_caps_at_ten() {
        let mut descriptors = Vec::new();
        for i in 0..15 {
            descriptors.push(descriptor(&format!("garment-{i}"), "wool", "boxy", "minimalist", 0.9, None));
        }
        descriptors.push(descriptor("low-conf", "wool", "boxy", "minimalist", 0.5, None));
        let pieces = signature_pieces_of(&descriptors);
        assert_eq!(pieces.len(), 10);
        assert!(pieces.iter().all(|p| p.confidence >= SIGNATURE_CONFIDENCE_FLOOR));
    }

    #[test]
    fn gender_preference_detects_dominant_presentation_matching_scenario_style() {
        let descriptors = vec![
            descriptor("dress", "silk", "a-line", "romantic", 0.9, Some(GenderPresentation::Feminine)),
            descriptor("dress", "silk", "a-line", "romantic", 0.9, Some(GenderPresentation::Feminine)),
            descriptor("dress", "silk", "a-line", "romantic", 0.9, Some(GenderPresentation::Feminine)),
            descriptor("dress", "silk", "a-line", "romantic", 0.9, Some(GenderPresentation::Masculine)),
        ];
        let pref = update_gender_preference(&descriptors, None);
        assert_eq!(pref.detected_gender, Some(DetectedGender::Feminine));
        assert!((pref.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn gender_preference_sets_both_when_top_two_are_close() {
        let descriptors = vec![
            descriptor("dress", "silk", "a-line", "romantic", 0.9, Some(GenderPresentation::Feminine)),
            descriptor("dress", "silk", "a-line", "romantic", 0.9, Some(GenderPresentation::Masculine)),
        ];
        let pref = update_gender_preference(&descriptors, None);
        assert_eq!(pref.detected_gender, Some(DetectedGender::Both));
    }

    #[test]
    fn manual_override_locks_setting_but_still_updates_detected_gender() {
        let mut existing_pref = ModelGenderPreference::default();
        existing_pref.setting = crate::types::GenderSetting::Female;
        existing_pref.manual_override = true;
        let existing = StyleProfile {
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
            model_gender_preference: existing_pref,
            updated_at: chrono::Utc::now(),
        };

        let descriptors = vec![descriptor("dress", "silk", "a-line", "romantic", 0.9, Some(GenderPresentation::Masculine))];
        let pref = update_gender_preference(&descriptors, Some(&existing));
        assert_eq!(pref.setting, crate::types::GenderSetting::Female);
        assert!(pref.manual_override);
        assert_eq!(pref.detected_gender, Some(DetectedGender::Masculine));
    }
}
