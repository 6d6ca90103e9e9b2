//! Prompt Builder (§4.4): the fixed 14-section component order, brand-
//! weighted Thompson sampling, and the LRU cache in front of it.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution as _};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::errors::StorageError;
use crate::profile::brand_dna;
use crate::store::{StyleProfileStore, TokenWeightStore};
use crate::types::{
    BrandDna, ChosenTokens, Distribution, PromptMetadata, PromptOptions, PromptPackage,
    StyleProfile, TokenWeight,
};

use super::cache::{cache_key, PromptCache};
use super::defaults;
use super::gender;

/// Tokens the negative prompt always contains (§4.4). Additional
/// negatives may be appended, never removed.
const NEGATIVE_FLOOR: &str = "blurry, low quality, distorted, deformed, bad anatomy, disfigured, poorly drawn, extra limbs, missing limbs, watermark, signature, text, logo, back view, rear view, turned away, profile view, side view";

/// Camera angles that read as facing away from the model; sanitized to a
/// forward-facing default (§4.4).
const AWAY_FACING_ANGLES: &[&str] = &["side", "profile", "back", "rear", "behind"];

const SELECTION_CATEGORIES: &[&str] =
    &["style_context", "garment", "fabric", "color", "shot_type", "lighting", "camera_angle", "background"];

pub struct PromptBuilder<P: StyleProfileStore, T: TokenWeightStore> {
    profiles: Arc<P>,
    weights: Arc<T>,
    cache: PromptCache,
    config: CoreConfig,
}

impl<P: StyleProfileStore, T: TokenWeightStore> PromptBuilder<P, T> {
    pub fn new(profiles: Arc<P>, weights: Arc<T>, config: CoreConfig) -> Self {
        let cache = PromptCache::new(config.prompt_cache_capacity, config.prompt_cache_ttl);
        Self { profiles, weights, cache, config }
    }

    pub async fn generate_prompt(
        &self,
        user_id: Uuid,
        options: PromptOptions,
    ) -> Result<PromptPackage, StorageError> {
        let use_cache = options.use_cache.unwrap_or(true);
        let enforce_brand_dna = options.enforce_brand_dna.unwrap_or(true);
        let brand_dna_strength = options.brand_dna_strength.unwrap_or(0.8).clamp(0.5, 1.0);
        let creativity = options.creativity.unwrap_or(0.6).clamp(0.0, 1.0);

        let key = cache_key(
            user_id,
            options.garment_type.as_deref(),
            options.season.as_deref(),
            options.occasion.as_deref(),
            creativity,
            enforce_brand_dna,
            brand_dna_strength,
            options.variation_seed,
        );

        if use_cache {
            if let Some(cached) = self.cache.read(&key) {
                return Ok(cached);
            }
        }

        let profile = self.profiles.get(user_id).await?;
        let is_exploration = profile.is_none();
        let brand_dna = profile.as_ref().map(brand_dna::derive);
        let brand_dna = if enforce_brand_dna { brand_dna } else { None };
        let b = if brand_dna.is_some() { brand_dna_strength } else { 0.0 };

        let mut chosen: HashMap<&str, String> = HashMap::new();
        for category in SELECTION_CATEGORIES.iter().copied() {
            let token = if category == "garment" {
                if let Some(locked) = &options.garment_type {
                    locked.clone()
                } else {
                    self.select(user_id, category, &profile, brand_dna.as_ref(), creativity, b, options.variation_seed)
                        .await?
                }
            } else {
                self.select(user_id, category, &profile, brand_dna.as_ref(), creativity, b, options.variation_seed)
                    .await?
            };
            chosen.insert(category, token);
        }

        let colors = self
            .select_top_n(user_id, "color", &profile, brand_dna.as_ref(), creativity, b, options.variation_seed, 2)
            .await?;

        let gender_preference = profile
            .as_ref()
            .map(|p| p.model_gender_preference.clone())
            .unwrap_or_default();
        let resolved_gender = gender::resolve(&gender_preference, options.generation_index);

        let garment = chosen.remove("garment").unwrap_or_default();
        let fabric = chosen.remove("fabric").unwrap_or_default();
        let style_context = chosen.remove("style_context").unwrap_or_default();
        let shot_type = chosen.remove("shot_type").unwrap_or_default();
        let lighting = chosen.remove("lighting").unwrap_or_default();
        let camera_angle = sanitize_camera_angle(&chosen.remove("camera_angle").unwrap_or_default());
        let background = chosen.remove("background").unwrap_or_default();

        let (silhouette, fit) = defaults::silhouette_and_fit_for(&garment);
        let finish = defaults::finish_for(&fabric);
        let direction = defaults::direction_for(&lighting);
        let height = defaults::camera_height_for(options.variation_seed);

        let mut sections: Vec<(String, f64)> = vec![
            (style_context.clone(), 1.4),
            (format!("{silhouette}, {fit} {garment}"), 1.3),
            (format!("in {fabric}, with {finish} finish"), 1.2),
            (colors_phrase(&colors), 1.3),
            (shot_type.clone(), 1.3),
            ("model facing camera".to_string(), 1.3),
            ("front-facing pose".to_string(), 1.2),
            (resolved_gender.phrase().to_string(), 1.3),
            (format!("{lighting} lighting from {direction}", lighting = lighting), 1.1),
            (camera_angle.clone(), 1.2),
            (format!("at {height}"), 1.0),
            (background.clone(), 1.0),
            ("professional fashion photography".to_string(), 1.3),
            ("high detail".to_string(), 1.2),
            ("8k".to_string(), 1.1),
            ("sharp focus".to_string(), 1.0),
            ("studio quality".to_string(), 1.0),
        ];

        if !options.user_modifiers.is_empty() {
            sections.push((options.user_modifiers.join(", "), 1.1));
        }

        let positive = sections
            .into_iter()
            .map(|(text, weight)| weighted_token(&text, weight))
            .filter(|token| !token.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let negative = NEGATIVE_FLOOR.to_string();

        let chosen_tokens = ChosenTokens {
            garment: garment.clone(),
            fabric: fabric.clone(),
            colors: colors.clone(),
            pose: "front-facing".to_string(),
            lighting: lighting.clone(),
            camera: camera_angle.clone(),
            background: background.clone(),
            style_context: style_context.clone(),
            model_gender: resolved_gender.phrase().to_string(),
        };

        let brand_consistency_score =
            brand_consistency_score(brand_dna.as_ref(), &fabric, &colors, &style_context);

        let package = PromptPackage {
            positive,
            negative,
            metadata: PromptMetadata {
                user_id,
                creativity,
                brand_dna_strength,
                chosen: chosen_tokens,
                brand_consistency_score,
                variation_seed: options.variation_seed,
                generation_index: options.generation_index,
                is_exploration,
            },
        };

        if use_cache {
            self.cache.add(key, package.clone());
        }

        Ok(package)
    }

    async fn candidate_set(&self, user_id: Uuid, category: &str, profile_dist: &Distribution) -> Result<Vec<String>, StorageError> {
        let mut set: std::collections::BTreeSet<String> = profile_dist.keys().cloned().collect();
        for weight in self.weights.get_all(user_id, Some(category)).await? {
            set.insert(weight.token);
        }
        for default in defaults::candidates_for(category) {
            set.insert(default.to_string());
        }
        Ok(set.into_iter().collect())
    }

    async fn select(
        &self,
        user_id: Uuid,
        category: &str,
        profile: &Option<StyleProfile>,
        brand_dna: Option<&BrandDna>,
        creativity: f64,
        b: f64,
        variation_seed: i64,
    ) -> Result<String, StorageError> {
        let top = self
            .select_top_n(user_id, category, profile, brand_dna, creativity, b, variation_seed, 1)
            .await?;
        Ok(top.into_iter().next().unwrap_or_default())
    }

    async fn select_top_n(
        &self,
        user_id: Uuid,
        category: &str,
        profile: &Option<StyleProfile>,
        brand_dna: Option<&BrandDna>,
        creativity: f64,
        b: f64,
        variation_seed: i64,
        n: usize,
    ) -> Result<Vec<String>, StorageError> {
        let profile_dist = profile_distribution_for(profile, category);
        let candidates = self.candidate_set(user_id, category, &profile_dist).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let existing_weights: HashMap<String, TokenWeight> = self
            .weights
            .get_all(user_id, Some(category))
            .await?
            .into_iter()
            .map(|w| (w.token.clone(), w))
            .collect();

        let mut rng = StdRng::seed_from_u64(seed_for(user_id, variation_seed, category));

        let mut scored: Vec<(f64, String)> = candidates
            .into_iter()
            .map(|candidate| {
                let (alpha, beta) = existing_weights
                    .get(&candidate)
                    .map(|w| w.beta_params())
                    .unwrap_or((1.0, 1.0));
                let theta: f64 = Beta::new(alpha, beta).map(|d| d.sample(&mut rng)).unwrap_or(0.5);
                let p_v = profile_dist.get(&candidate).copied().unwrap_or(0.0);
                let w_v = existing_weights.get(&candidate).map(|w| w.normalized()).unwrap_or(0.5);
                let is_signature = if is_signature(category, &candidate, brand_dna) { 1.0 } else { 0.0 };
                let brand_term = 0.5 * p_v + 0.3 * w_v + 0.2 * is_signature;
                let u: f64 = rng.gen_range(0.0..1.0);
                let s = (1.0 - creativity) * ((1.0 - b) * theta + b * brand_term) + creativity * u;
                (s, candidate)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().take(n.max(1)).map(|(_, v)| v).collect())
    }
}

fn profile_distribution_for(profile: &Option<StyleProfile>, category: &str) -> Distribution {
    let Some(profile) = profile else { return Distribution::new() };
    match category {
        "garment" => profile.distribution("garments").cloned().unwrap_or_default(),
        "fabric" => profile.distribution("fabrics").cloned().unwrap_or_default(),
        "color" => profile.distribution("colors").cloned().unwrap_or_default(),
        "style_context" => profile
            .aesthetic_themes
            .iter()
            .map(|t| (t.name.clone(), t.strength))
            .collect(),
        _ => Distribution::new(),
    }
}

fn is_signature(category: &str, candidate: &str, brand_dna: Option<&BrandDna>) -> bool {
    let Some(dna) = brand_dna else { return false };
    match category {
        "color" => dna.signature_colors.iter().any(|c| c == candidate),
        "fabric" => dna.signature_fabrics.iter().any(|f| f == candidate),
        "style_context" => {
            dna.primary_aesthetic.as_deref() == Some(candidate)
                || dna.secondary_aesthetic.as_deref() == Some(candidate)
        }
        _ => false,
    }
}

fn seed_for(user_id: Uuid, variation_seed: i64, category: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(variation_seed.to_le_bytes());
    hasher.update(category.as_bytes());
    let digest = hasher.finalize();
    u64::from_le_bytes(digest[0..8].try_into().expect("sha256 digest is at least 8 bytes"))
}

/// `[text:weight]` when `weight > 1.0`; bare `text` when `weight ∈
/// [0.9,1.0]`; dropped when `weight < 0.9` (§4.4).
fn weighted_token(text: &str, weight: f64) -> String {
    if text.is_empty() {
        return String::new();
    }
    if weight > 1.0 {
        format!("[{text}:{weight:.1}]")
    } else if weight >= 0.9 {
        text.to_string()
    } else {
        String::new()
    }
}

fn sanitize_camera_angle(angle: &str) -> String {
    let lower = angle.to_lowercase();
    if AWAY_FACING_ANGLES.iter().any(|bad| lower.contains(bad)) {
        return "3/4 front angle".to_string();
    }
    if lower.contains("front") {
        angle.to_string()
    } else {
        format!("{angle} front")
    }
}

fn colors_phrase(colors: &[String]) -> String {
    match colors {
        [] => String::new(),
        [one] => format!("{one} palette"),
        [first, second, ..] => format!("{first} and {second} palette"),
    }
}

fn brand_consistency_score(
    brand_dna: Option<&BrandDna>,
    fabric: &str,
    colors: &[String],
    style_context: &str,
) -> f64 {
    let Some(dna) = brand_dna else { return 0.0 };
    let mut hits = 0usize;
    let mut total = 0usize;

    total += 1;
    if is_signature("fabric", fabric, Some(dna)) {
        hits += 1;
    }
    total += 1;
    if is_signature("style_context", style_context, Some(dna)) {
        hits += 1;
    }
    for color in colors {
        total += 1;
        if is_signature("color", color, Some(dna)) {
            hits += 1;
        }
    }

    hits as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;

    fn builder() -> PromptBuilder<SqliteStore, SqliteStore> {
        let db = Arc::new(SqliteStore::open_in_memory().expect("in-memory sqlite"));
        PromptBuilder::new(db.clone(), db, CoreConfig::default())
    }

    #[tokio::test]
    async fn default_profile_mode_marks_exploration_and_fills_all_sections() {
        let builder = builder();
        let user_id = Uuid::new_v4();
        let options = PromptOptions { variation_seed: 0, generation_index: 0, ..Default::default() };
        let package = builder.generate_prompt(user_id, options).await.unwrap();

        assert!(package.metadata.is_exploration);
        assert!(package.positive.contains("model facing camera"));
        assert!(package.positive.contains("front-facing pose"));
        assert!(package.negative.contains("back view"));
        assert!(package.negative.contains("rear view"));
        assert!(package.negative.contains("turned away"));
    }

    #[tokio::test]
    async fn camera_angle_always_contains_front() {
        let builder = builder();
        let user_id = Uuid::new_v4();
        for seed in 0..10 {
            let options = PromptOptions { variation_seed: seed, generation_index: 0, ..Default::default() };
            let package = builder.generate_prompt(user_id, options).await.unwrap();
            assert!(package.metadata.chosen.camera.to_lowercase().contains("front"));
        }
    }

    #[tokio::test]
    async fn fixed_creativity_zero_is_deterministic_across_calls() {
        let builder = builder();
        let user_id = Uuid::new_v4();
        let options = PromptOptions {
            creativity: Some(0.0),
            variation_seed: 7,
            generation_index: 0,
            use_cache: Some(false),
            ..Default::default()
        };
        let first = builder.generate_prompt(user_id, options.clone()).await.unwrap();
        let second = builder.generate_prompt(user_id, options).await.unwrap();
        assert_eq!(first.metadata.chosen.garment, second.metadata.chosen.garment);
        assert_eq!(first.metadata.chosen.fabric, second.metadata.chosen.fabric);
    }

    #[tokio::test]
    async fn batch_uses_distinct_variation_seeds_without_dedup() {
        let builder = builder();
        let user_id = Uuid::new_v4();
        let mut seeds_seen = std::collections::HashSet::new();
        for i in 0..5i64 {
            let options = PromptOptions { variation_seed: i, generation_index: i, use_cache: Some(false), ..Default::default() };
            let package = builder.generate_prompt(user_id, options).await.unwrap();
            seeds_seen.insert(package.metadata.variation_seed);
        }
        assert_eq!(seeds_seen.len(), 5);
    }

    #[tokio::test]
    async fn cache_returns_identical_package_on_second_call() {
        let builder = builder();
        let user_id = Uuid::new_v4();
        let options = PromptOptions { variation_seed: 1, generation_index: 0, ..Default::default() };
        let first = builder.generate_prompt(user_id, options.clone()).await.unwrap();
        let second = builder.generate_prompt(user_id, options).await.unwrap();
        assert_eq!(first.positive, second.positive);
    }

    #[test]
    fn weighted_token_follows_the_three_tier_rule() {
        assert_eq!(weighted_token("contemporary", 1.4), "[contemporary:1.4]");
        assert_eq!(weighted_token("studio quality", 1.0), "studio quality");
        assert_eq!(weighted_token("dropped", 0.5), "");
    }

    #[test]
    fn camera_angle_sanitization_replaces_away_facing_angles() {
        assert_eq!(sanitize_camera_angle("side angle"), "3/4 front angle");
        assert_eq!(sanitize_camera_angle("back"), "3/4 front angle");
        assert_eq!(sanitize_camera_angle("eye level"), "eye level front");
        assert_eq!(sanitize_camera_angle("eye level front"), "eye level front");
    }
}
