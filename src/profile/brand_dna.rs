//! Brand DNA derivation (§4.3): computed in-memory from a `StyleProfile`
//! at prompt time, never persisted separately.

use std::collections::HashMap;

use crate::types::{BrandDna, StyleProfile};

/// Derive Brand DNA from a profile. Pure function: same profile always
/// yields the same Brand DNA.
pub fn derive(profile: &StyleProfile) -> BrandDna {
    let primary_aesthetic = profile.aesthetic_themes.first().map(|t| t.name.clone());
    let secondary_aesthetic = profile.aesthetic_themes.get(1).map(|t| t.name.clone());

    let signature_colors = top_n_from_distribution(profile, "colors", 4);
    let signature_fabrics = top_n_from_distribution(profile, "fabrics", 3);
    let signature_constructions = profile
        .construction_patterns
        .iter()
        .take(5)
        .map(|p| p.name.clone())
        .collect();

    let photography_preferences = profile.photography_preferences.clone();

    let brand_strength = profile
        .aesthetic_themes
        .iter()
        .take(2)
        .map(|t| t.strength)
        .sum::<f64>()
        .clamp(0.0, 1.0);

    BrandDna {
        primary_aesthetic,
        secondary_aesthetic,
        signature_colors,
        signature_fabrics,
        signature_constructions,
        photography_preferences,
        brand_strength,
    }
}

fn top_n_from_distribution(profile: &StyleProfile, category: &str, n: usize) -> Vec<String> {
    let Some(dist) = profile.distribution(category) else {
        return Vec::new();
    };
    let mut entries: Vec<(&String, &f64)> = dist.iter().collect();
    entries.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(b.0)));
    entries.into_iter().take(n).map(|(k, _)| k.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AestheticTheme, ModelGenderPreference};
    use uuid::Uuid;

    fn profile_with(themes: Vec<AestheticTheme>, colors: HashMap<String, f64>) -> StyleProfile {
        let mut distributions = HashMap::new();
        distributions.insert("colors".to_string(), colors);
        StyleProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            portfolio_id: Uuid::new_v4(),
            distributions,
            aesthetic_themes: themes,
            construction_patterns: Vec::new(),
            signature_pieces: Vec::new(),
            style_tags: Vec::new(),
            garment_types: Vec::new(),
            style_description: String::new(),
            avg_confidence: 0.8,
            avg_completeness: 80.0,
            photography_preferences: HashMap::new(),
            model_gender_preference: ModelGenderPreference::default(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn primary_and_secondary_aesthetic_are_top_two_themes() {
        let themes = vec![
            AestheticTheme { name: "minimalist".into(), count: 5, strength: 0.5, frequency_label: "50%".into() },
            AestheticTheme { name: "romantic".into(), count: 3, strength: 0.3, frequency_label: "30%".into() },
        ];
        let dna = derive(&profile_with(themes, HashMap::new()));
        assert_eq!(dna.primary_aesthetic.as_deref(), Some("minimalist"));
        assert_eq!(dna.secondary_aesthetic.as_deref(), Some("romantic"));
    }

    #[test]
    fn signature_colors_are_top_four_by_frequency() {
        let mut colors = HashMap::new();
        colors.insert("navy".to_string(), 0.4);
        colors.insert("cream".to_string(), 0.3);
        colors.insert("black".to_string(), 0.2);
        colors.insert("blush".to_string(), 0.05);
        colors.insert("emerald".to_string(), 0.05);
        let dna = derive(&profile_with(Vec::new(), colors));
        assert_eq!(dna.signature_colors.len(), 4);
        assert_eq!(dna.signature_colors[0], "navy");
    }

    #[test]
    fn photography_preferences_pass_through_from_the_profile() {
        let mut profile = profile_with(Vec::new(), HashMap::new());
        profile.photography_preferences.insert("lighting_type".to_string(), "studio softbox".to_string());
        let dna = derive(&profile);
        assert_eq!(dna.photography_preferences.get("lighting_type").map(String::as_str), Some("studio softbox"));
    }
}
