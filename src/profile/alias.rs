//! Deterministic synonym table for distribution aggregation (§4.2 step 2).
//! A single alias table, consolidated rather than scattered per-category,
//! per the Design Notes' consolidation instruction.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("navy blue", "navy"),
        ("dark blue", "navy"),
        ("midnight blue", "navy"),
        ("ivory", "cream"),
        ("off-white", "cream"),
        ("off white", "cream"),
        ("eggshell", "cream"),
        ("charcoal grey", "charcoal"),
        ("charcoal gray", "charcoal"),
        ("jet black", "black"),
        ("blush pink", "blush"),
        ("dusty rose", "blush"),
        ("wool blend", "wool"),
        ("merino wool", "wool"),
        ("silk blend", "silk"),
        ("faux leather", "leather"),
        ("vegan leather", "leather"),
        ("tee", "t-shirt"),
        ("tee shirt", "t-shirt"),
        ("jean", "denim"),
        ("jeans", "denim"),
        ("blazer jacket", "blazer"),
        ("a-line", "a-line silhouette"),
        ("aline", "a-line silhouette"),
    ])
});

/// Lowercase, trim, and coalesce known synonyms to one canonical name.
pub fn normalize(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    ALIASES.get(lower.as_str()).map(|s| s.to_string()).unwrap_or(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_known_color_synonyms() {
        assert_eq!(normalize("Navy Blue"), "navy");
        assert_eq!(normalize("Dark Blue"), "navy");
        assert_eq!(normalize("navy"), "navy");
    }

    #[test]
    fn passes_through_unknown_terms_lowercased() {
        assert_eq!(normalize("Emerald Green"), "emerald green");
    }
}
