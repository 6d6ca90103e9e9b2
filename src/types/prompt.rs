//! Prompt package wire contract (§6.2) and the Prompt Builder's options.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `generate_prompt`'s recognized options (§4.4 public contract).
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub garment_type: Option<String>,
    pub season: Option<String>,
    pub occasion: Option<String>,
    /// Defaults to the specificity analyzer's output when absent.
    pub creativity: Option<f64>,
    pub use_cache: Option<bool>,
    pub variation_seed: i64,
    pub user_modifiers: Vec<String>,
    pub enforce_brand_dna: Option<bool>,
    pub brand_dna_strength: Option<f64>,
    pub respect_user_intent: Option<bool>,
    pub parsed_user_prompt: Option<ParsedUserPrompt>,
    pub generation_index: i64,
}

#[derive(Debug, Clone)]
pub struct ParsedUserPrompt {
    pub text: String,
}

/// The categories the Thompson sampler resolved a token for, copied
/// verbatim into feedback's `tokens_used` map (§6.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChosenTokens {
    pub garment: String,
    pub fabric: String,
    pub colors: Vec<String>,
    pub pose: String,
    pub lighting: String,
    pub camera: String,
    pub background: String,
    pub style_context: String,
    pub model_gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMetadata {
    pub user_id: Uuid,
    pub creativity: f64,
    pub brand_dna_strength: f64,
    pub chosen: ChosenTokens,
    pub brand_consistency_score: f64,
    pub variation_seed: i64,
    pub generation_index: i64,
    pub is_exploration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPackage {
    pub positive: String,
    pub negative: String,
    pub metadata: PromptMetadata,
}
