//! Specificity Analyzer (§4.5): a pure, deterministic mapping from a
//! free-text command + extracted entities to a creativity temperature.
//! No I/O, no randomness -- every rule here is a literal scoring constant
//! from the specification, kept in one place rather than scattered.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const VAGUE_TERMS: &[&str] = &["some", "random", "varied", "different", "surprise", "any"];
const PRECISE_TERMS: &[&str] = &["specifically", "exactly", "precisely"];
const TECHNICAL_FABRIC_TERMS: &[&str] = &["cashmere", "gabardine", "twill", "poplin", "charmeuse"];
const TECHNICAL_CONSTRUCTION_TERMS: &[&str] = &["notched lapel", "princess seam", "welt pocket"];

static VAGUE_WORD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| word_patterns(VAGUE_TERMS));
static PRECISE_WORD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| word_patterns(PRECISE_TERMS));

fn word_patterns(terms: &[&str]) -> Vec<Regex> {
    terms
        .iter()
        .map(|t| Regex::new(&format!(r"\b{}\b", regex::escape(t))).expect("fixed term is valid regex"))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecificityMode {
    Exploratory,
    Balanced,
    Specific,
}

/// Entities extracted from the free-text command by a tokenizer external
/// to this component (§4.5 Inputs).
#[derive(Debug, Clone, Default)]
pub struct CommandEntities {
    pub colors: Vec<String>,
    pub styles: Vec<String>,
    pub fabrics: Vec<String>,
    pub modifiers: Vec<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificityResult {
    pub score: f64,
    pub creativity: f64,
    pub mode: SpecificityMode,
    pub reasoning: String,
}

/// Map `(command, entities)` to a creativity temperature (§4.5).
pub fn analyze(command: &str, entities: &CommandEntities) -> SpecificityResult {
    let lower = command.to_lowercase();
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let entity_count =
        entities.colors.len() + entities.styles.len() + entities.fabrics.len() + entities.modifiers.len();
    let descriptor_bonus = (0.3 * entity_count as f64).min(0.7);
    if descriptor_bonus > 0.0 {
        score += descriptor_bonus;
        reasons.push(format!(
            "{entity_count} descriptor entit{} contributed {descriptor_bonus:.2}",
            if entity_count == 1 { "y" } else { "ies" }
        ));
    }

    if let Some(count) = entities.count {
        let quantity_bonus = if count == 1 {
            0.3
        } else if (2..=4).contains(&count) {
            0.2
        } else if count >= 5 {
            0.1
        } else {
            0.0
        };
        if quantity_bonus > 0.0 {
            score += quantity_bonus;
            reasons.push(format!("requested count {count} contributed {quantity_bonus:.2}"));
        }
    }

    let has_vague = VAGUE_WORD_PATTERNS.iter().any(|re| re.is_match(&lower));
    if has_vague {
        score -= 0.3;
        reasons.push("vague language detected (-0.30)".to_string());
    }

    let has_precise = PRECISE_WORD_PATTERNS.iter().any(|re| re.is_match(&lower));
    if has_precise {
        score += 0.3;
        reasons.push("precise language detected (+0.30)".to_string());
    }

    let has_technical_fabric = TECHNICAL_FABRIC_TERMS.iter().any(|t| lower.contains(t));
    if has_technical_fabric {
        score += 0.15;
        reasons.push("technical fabric term detected (+0.15)".to_string());
    }

    let has_technical_construction = TECHNICAL_CONSTRUCTION_TERMS.iter().any(|t| lower.contains(t));
    if has_technical_construction {
        score += 0.15;
        reasons.push("technical construction term detected (+0.15)".to_string());
    }

    let populated_categories = [
        !entities.colors.is_empty(),
        !entities.styles.is_empty(),
        !entities.fabrics.is_empty(),
        !entities.modifiers.is_empty(),
    ]
    .into_iter()
    .filter(|p| *p)
    .count();
    if populated_categories >= 3 {
        score += 0.1;
        reasons.push(format!(
            "multi-layer modifiers across {populated_categories} categories contributed 0.10"
        ));
    }

    let clamped_score = score.clamp(0.0, 1.0);
    let creativity = 1.2 - 0.9 * clamped_score;
    let mode = if clamped_score < 0.35 {
        SpecificityMode::Exploratory
    } else if clamped_score < 0.7 {
        SpecificityMode::Balanced
    } else {
        SpecificityMode::Specific
    };

    if reasons.is_empty() {
        reasons.push("no specificity signals found".to_string());
    }

    SpecificityResult {
        score: clamped_score,
        creativity,
        mode,
        reasoning: reasons.join("; "),
    }
}
