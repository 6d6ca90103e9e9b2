//! Built-in default tables (§4.4): used to pad the Thompson-sampling
//! candidate set and to drive default-profile/exploration mode when a
//! user has no `StyleProfile` yet. Immutable process-wide state, per §5's
//! isolation note.

/// Default candidates for a selection category. Always unioned into the
/// candidate set, even when a profile exists, so a category with sparse
/// profile data still has somewhere to sample from.
pub fn candidates_for(category: &str) -> &'static [&'static str] {
    match category {
        "garment" => &["blazer", "dress", "trouser", "blouse", "coat"],
        "fabric" => &["wool", "silk", "cotton", "linen", "cashmere"],
        "color" => &["navy", "cream", "black", "charcoal", "blush"],
        "shot_type" => &[
            "three-quarter length shot",
            "full length shot",
            "close-up shot",
            "waist-up shot",
        ],
        "lighting" => &["soft natural", "golden hour", "dramatic", "studio strobe"],
        "camera_angle" => &["front", "slightly elevated front", "low angle front"],
        "background" => &["clean studio background", "soft gradient background", "neutral backdrop"],
        "style_context" => &["contemporary", "minimalist", "romantic", "editorial", "avant-garde"],
        _ => &[],
    }
}

/// Fabric finish paired with a chosen fabric, for the *Fabric* prompt
/// section's `"in {material}, with {finish} finish"` template.
pub fn finish_for(fabric: &str) -> &'static str {
    match fabric {
        "silk" => "lustrous",
        "wool" => "brushed",
        "cotton" => "matte",
        "linen" => "textured",
        "cashmere" => "soft-brushed",
        _ => "matte",
    }
}

/// `(silhouette, fit)` paired with a chosen garment type, for the
/// *Primary garment* prompt section.
pub fn silhouette_and_fit_for(garment: &str) -> (&'static str, &'static str) {
    match garment {
        "blazer" => ("structured", "tailored"),
        "dress" => ("flowing", "fitted"),
        "trouser" => ("straight-leg", "relaxed"),
        "blouse" => ("relaxed", "loose"),
        "coat" => ("oversized", "relaxed"),
        _ => ("tailored", "relaxed"),
    }
}

/// Light direction paired with a chosen lighting type, for the *Lighting*
/// prompt section's `"{type} lighting from {direction}"` template.
pub fn direction_for(lighting: &str) -> &'static str {
    match lighting {
        "soft natural" => "the left",
        "golden hour" => "the side",
        "dramatic" => "above",
        _ => "the front",
    }
}

/// Deterministic camera-height phrase. Not a Thompson-sampled category;
/// cycles by `variation_seed` so batches still vary without RNG state.
pub fn camera_height_for(variation_seed: i64) -> &'static str {
    const HEIGHTS: [&str; 3] = ["eye level", "slightly elevated", "low angle"];
    HEIGHTS[(variation_seed.rem_euclid(3)) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_height_cycles_deterministically() {
        assert_eq!(camera_height_for(0), "eye level");
        assert_eq!(camera_height_for(1), "slightly elevated");
        assert_eq!(camera_height_for(2), "low angle");
        assert_eq!(camera_height_for(3), "eye level");
    }

    #[test]
    fn unknown_category_has_no_defaults() {
        assert!(candidates_for("unknown").is_empty());
    }
}
