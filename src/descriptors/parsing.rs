//! JSON parsing, permissive repair, and completeness scoring for raw
//! vision-model responses (§4.1 steps 3-4, §6.1).

use serde::Deserialize;

use crate::types::{
    ContextualAttributes, DescriptorMetadata, ExecutiveSummary, Garment, ModelDemographics,
    Photography, StylingContext,
};

/// The shape a vision adapter is expected to return. Extra top-level keys
/// (e.g. `technical_fashion_notes`) are ignored rather than rejected --
/// §6.1 only requires that declared fields be present-or-null.
#[derive(Debug, Deserialize)]
pub struct RawDescriptorJson {
    #[serde(default)]
    pub executive_summary: ExecutiveSummary,
    #[serde(default)]
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
}

#[derive(Debug, thiserror::Error)]
#[error("could not parse vision response as descriptor JSON: {0}")]
pub struct ParseError(pub String);

/// Parse raw model text into a `RawDescriptorJson`, attempting one
/// permissive repair (strip code fences, trailing commas) if strict
/// parsing fails.
pub fn parse_descriptor_json(raw_text: &str) -> Result<RawDescriptorJson, ParseError> {
    if let Ok(parsed) = serde_json::from_str::<RawDescriptorJson>(raw_text) {
        return Ok(parsed);
    }

    let repaired = repair_json_text(raw_text);
    serde_json::from_str::<RawDescriptorJson>(&repaired).map_err(|e| ParseError(e.to_string()))
}

/// Strip markdown code fences and trailing commas before a retry parse.
fn repair_json_text(raw_text: &str) -> String {
    let mut text = raw_text.trim();

    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    let text = text.trim();

    // Remove trailing commas before a closing `}` or `]`.
    let mut repaired = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ',' {
            // Look ahead past whitespace for a closing brace/bracket.
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        repaired.push(c);
        i += 1;
    }
    repaired
}

/// `(populated, total)` leaf counts for one scalar `Option<T>` leaf.
fn opt_leaf<T>(value: &Option<T>) -> (usize, usize) {
    (if value.is_some() { 1 } else { 0 }, 1)
}

fn opt_vec_leaf<T>(value: &[T]) -> (usize, usize) {
    (if value.is_empty() { 0 } else { 1 }, 1)
}

fn add((ap, at): (usize, usize), (bp, bt): (usize, usize)) -> (usize, usize) {
    (ap + bp, at + bt)
}

fn sum_leaves(leaves: Vec<(usize, usize)>) -> (usize, usize) {
    leaves.into_iter().fold((0, 0), add)
}

fn executive_summary_leaves(s: &ExecutiveSummary) -> (usize, usize) {
    sum_leaves(vec![
        opt_leaf(&s.one_sentence_description),
        opt_leaf(&s.dominant_aesthetic),
        opt_vec_leaf(s.key_garments.as_deref().unwrap_or(&[])),
    ])
}

fn garment_leaves(g: &Garment) -> (usize, usize) {
    sum_leaves(vec![
        opt_leaf(&g.garment_type),
        opt_leaf(&g.silhouette.overall_shape),
        opt_leaf(&g.silhouette.fit),
        opt_leaf(&g.fabric.primary_material),
        opt_leaf(&g.fabric.weight),
        opt_leaf(&g.fabric.drape),
        opt_leaf(&g.fabric.finish),
        opt_vec_leaf(&g.color_palette),
        opt_leaf(&g.construction.seams),
        opt_leaf(&g.construction.stitching),
        opt_leaf(&g.construction.closures),
        opt_leaf(&g.construction.hardware),
        opt_leaf(&g.sleeve_length),
        opt_leaf(&g.collar),
        opt_leaf(&g.length),
    ])
}

fn model_demographics_leaves(m: &ModelDemographics) -> (usize, usize) {
    sum_leaves(vec![
        opt_leaf(&m.ethnicity),
        opt_leaf(&m.body_type),
        opt_leaf(&m.proportions),
        opt_leaf(&m.gender_presentation),
    ])
}

fn photography_leaves(p: &Photography) -> (usize, usize) {
    sum_leaves(vec![
        opt_leaf(&p.shot_composition.shot_type),
        opt_leaf(&p.pose.gaze),
        opt_leaf(&p.pose.head),
        opt_leaf(&p.pose.body_position),
        opt_leaf(&p.lighting.lighting_type),
        opt_leaf(&p.lighting.direction),
        opt_leaf(&p.camera_angle.horizontal),
        opt_leaf(&p.camera_angle.vertical),
        opt_leaf(&p.background.background_type),
    ])
}

fn styling_context_leaves(s: &StylingContext) -> (usize, usize) {
    sum_leaves(vec![
        opt_vec_leaf(s.accessories.as_deref().unwrap_or(&[])),
        opt_leaf(&s.styling_approach),
        opt_leaf(&s.overall_aesthetic),
    ])
}

fn contextual_attributes_leaves(c: &ContextualAttributes) -> (usize, usize) {
    sum_leaves(vec![
        opt_leaf(&c.mood_aesthetic),
        opt_leaf(&c.season),
        opt_leaf(&c.occasion),
    ])
}

fn metadata_leaves(m: &DescriptorMetadata) -> (usize, usize) {
    sum_leaves(vec![
        opt_leaf(&m.model_id),
        opt_leaf(&m.prompt_version),
        opt_vec_leaf(&m.uncertain_details),
    ])
}

/// `completeness_percentage = (populated leaf fields / total leaf fields) * 100`
/// (§4.1 step 4). Requires at least one garment to be meaningful; an
/// empty `garments` vec scores the non-garment sections only.
pub fn completeness_percentage(raw: &RawDescriptorJson) -> f64 {
    let mut populated = 0usize;
    let mut total = 0usize;

    let sections = [
        executive_summary_leaves(&raw.executive_summary),
        model_demographics_leaves(&raw.model_demographics),
        photography_leaves(&raw.photography),
        styling_context_leaves(&raw.styling_context),
        contextual_attributes_leaves(&raw.contextual_attributes),
        metadata_leaves(&raw.metadata),
    ];
    for (p, t) in sections {
        populated += p;
        total += t;
    }

    for garment in &raw.garments {
        let (p, t) = garment_leaves(garment);
        populated += p;
        total += t;
    }

    if total == 0 {
        return 0.0;
    }
    (populated as f64 / total as f64) * 100.0
}

/// `overall_confidence` = mean of per-garment confidences, clamped to
/// `[0,1]`. `0.5` when the model omitted confidence on every garment
/// (§4.1 step 5).
pub fn overall_confidence(raw: &RawDescriptorJson) -> f64 {
    let confidences: Vec<f64> = raw.garments.iter().filter_map(|g| g.confidence).collect();
    if confidences.is_empty() {
        return 0.5;
    }
    let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
    mean.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_json() {
        let raw = r#"{"garments":[{"garment_type":"blazer","confidence":0.9}]}"#;
        let parsed = parse_descriptor_json(raw).unwrap();
        assert_eq!(parsed.garments.len(), 1);
        assert_eq!(parsed.garments[0].garment_type.as_deref(), Some("blazer"));
    }

    #[test]
    fn repairs_code_fenced_json_with_trailing_comma() {
        let raw = "```json\n{\"garments\":[{\"garment_type\":\"blazer\",}],}\n```";
        let parsed = parse_descriptor_json(raw).unwrap();
        assert_eq!(parsed.garments[0].garment_type.as_deref(), Some("blazer"));
    }

    #[test]
    fn fails_on_irrecoverable_garbage() {
        let result = parse_descriptor_json("not json at all, sorry");
        assert!(result.is_err());
    }

    #[test]
    fn overall_confidence_defaults_to_half_when_omitted() {
        let raw = parse_descriptor_json(r#"{"garments":[{"garment_type":"dress"}]}"#).unwrap();
        assert_eq!(overall_confidence(&raw), 0.5);
    }

    #[test]
    fn overall_confidence_is_mean_of_garment_confidences() {
        let raw = parse_descriptor_json(
            r#"{"garments":[{"garment_type":"a","confidence":0.8},{"garment_type":"b","confidence":0.6}]}"#,
        )
        .unwrap();
        assert!((overall_confidence(&raw) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn completeness_counts_populated_over_total_leaves() {
        let empty = parse_descriptor_json("{}").unwrap();
        assert_eq!(completeness_percentage(&empty), 0.0);

        let raw = parse_descriptor_json(
            r#"{"executive_summary":{"dominant_aesthetic":"minimalist"},"garments":[{"garment_type":"blazer"}]}"#,
        )
        .unwrap();
        let pct = completeness_percentage(&raw);
        assert!(pct > 0.0 && pct < 100.0);
    }
}
