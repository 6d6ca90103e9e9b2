//! Generations and the external Generator Adapter interface (§4.8, §6.4).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt_text: String,
    pub negative_prompt: String,
    pub metadata: serde_json::Value,
    pub provider_id: String,
    pub status: GenerationStatus,
    pub cost: Option<f64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationAsset {
    pub id: Uuid,
    pub generation_id: Uuid,
    pub url: String,
    pub prompt_index: i32,
    pub provider_id: String,
    pub file_size: Option<u64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Generation settings passed to a provider (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub provider: String,
    pub quality: Option<String>,
    pub size: Option<String>,
    pub steps: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub images: Vec<GeneratedImage>,
    pub revised_prompt: Option<String>,
    pub cost: Option<f64>,
    pub latency_ms: u64,
}

/// The kinds of failures an external provider can report (§4.8, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    #[error("rate limited")]
    RateLimited,
    #[error("invalid input")]
    InvalidInput,
    #[error("provider unavailable")]
    ProviderUnavailable,
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error("unknown provider error")]
    Unknown,
}

impl ProviderErrorKind {
    /// `rate_limited` and `provider_unavailable` are retried with backoff
    /// (max 3 attempts); `invalid_input` and `quota_exceeded` surface
    /// immediately (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited | ProviderErrorKind::ProviderUnavailable
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("provider error: {kind}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub retry_after: Option<std::time::Duration>,
    pub message: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind) -> Self {
        Self {
            kind,
            retry_after: None,
            message: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: std::time::Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// Uniform adapter contract every external text-to-image provider
/// implements. The core depends only on this trait -- adding a provider
/// is a new implementation, not a subclass.
#[async_trait]
pub trait GeneratorAdapter: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn generate(
        &self,
        positive: &str,
        negative: &str,
        settings: &GenerationSettings,
    ) -> Result<GenerationResult, ProviderError>;
}

/// Free-form per-(user,category) candidate bookkeeping shared between the
/// weight store and the prompt builder's default tables.
pub type CandidateSet = HashMap<String, Vec<String>>;
