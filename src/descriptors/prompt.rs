//! Builds the structured prompt sent to the vision adapter (§4.1 step 1).

/// The directives every extraction prompt must carry, verbatim enough to
/// be machine-checkable in tests while reading as natural instruction
/// text to the model.
const MANDATORY_DIRECTIVES: &[&str] = &[
    "Use precise, specific vocabulary for every garment and styling detail.",
    "Be exhaustive: capture every visible detail, however minor.",
    "Be honest: use null or \"not_visible\" whenever you are unsure, never guess.",
    "Describe layered garments as separate entries in the garments array, ordered outermost first.",
    "Describe construction details: seams, stitching, closures, and hardware.",
    "Infer fabric weight and finish from visible drape when the material itself is ambiguous.",
    "Describe model demographics respectfully and only from what is visibly apparent.",
    "Report photography specifics: shot composition, pose, lighting, camera angle, and background.",
];

/// Build the base extraction prompt for one image.
pub fn build_extraction_prompt() -> String {
    let mut prompt = String::from(
        "Analyze this fashion photograph in forensic detail and return strict JSON \
         matching the UltraDetailedDescriptor schema (executive_summary, garments, \
         model_demographics, photography, styling_context, contextual_attributes, \
         metadata). Do not include any text outside the JSON object.\n\n",
    );
    for directive in MANDATORY_DIRECTIVES {
        prompt.push_str("- ");
        prompt.push_str(directive);
        prompt.push('\n');
    }
    prompt
}

/// Build the stricter retry prompt (§4.1 step 6), carrying forward the
/// previous attempt's raw JSON and the weaknesses that triggered the
/// retry so the model can correct them directly.
pub fn build_retry_prompt(previous_json: &str, weaknesses: &[String]) -> String {
    let mut prompt = build_extraction_prompt();
    prompt.push_str(
        "\nYour previous response did not meet the required confidence or completeness \
         bar. Correct the following weaknesses while preserving everything that was \
         already accurate:\n",
    );
    for weakness in weaknesses {
        prompt.push_str("- ");
        prompt.push_str(weakness);
        prompt.push('\n');
    }
    prompt.push_str("\nPrevious response:\n");
    prompt.push_str(previous_json);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_carries_every_mandatory_directive() {
        let prompt = build_extraction_prompt();
        assert!(prompt.contains("precise, specific vocabulary"));
        assert!(prompt.contains("exhaustive"));
        assert!(prompt.contains("null or \"not_visible\""));
        assert!(prompt.contains("separate entries"));
        assert!(prompt.contains("construction details"));
        assert!(prompt.contains("drape"));
        assert!(prompt.contains("respectfully"));
        assert!(prompt.contains("photography specifics"));
        assert!(prompt.contains("strict JSON"));
    }

    #[test]
    fn retry_prompt_includes_previous_json_and_weaknesses() {
        let prompt = build_retry_prompt(
            r#"{"overall_confidence":0.55}"#,
            &["low confidence on fabric identification".to_string()],
        );
        assert!(prompt.contains(r#"{"overall_confidence":0.55}"#));
        assert!(prompt.contains("low confidence on fabric identification"));
    }
}
