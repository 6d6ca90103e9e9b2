//! `MockAdapter`: the only `GeneratorAdapter` implementation this crate
//! carries. Concrete provider wiring (Imagen, SD, Gemini, DALL-E) is out of
//! scope; this exists so orchestrator and prompt-builder tests have a
//! `GeneratorAdapter` to exercise, the way the teacher ships provider
//! structs whose `call`/`acall` are stubs returning a descriptive error.

use async_trait::async_trait;

use crate::types::{
    GenerationSettings, GenerationResult, GeneratedImage, GeneratorAdapter, ProviderError,
    ProviderErrorKind,
};

/// Always succeeds with one placeholder image, unless configured to fail.
pub struct MockAdapter {
    provider_id: String,
    fail_with: Option<ProviderErrorKind>,
}

impl MockAdapter {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self { provider_id: provider_id.into(), fail_with: None }
    }

    pub fn failing(provider_id: impl Into<String>, kind: ProviderErrorKind) -> Self {
        Self { provider_id: provider_id.into(), fail_with: Some(kind) }
    }
}

#[async_trait]
impl GeneratorAdapter for MockAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn generate(
        &self,
        positive: &str,
        _negative: &str,
        settings: &GenerationSettings,
    ) -> Result<GenerationResult, ProviderError> {
        log::debug!(
            "MockAdapter.generate: provider={}, positive_len={}",
            self.provider_id,
            positive.len()
        );

        if let Some(kind) = self.fail_with {
            return Err(ProviderError::new(kind));
        }

        let _ = settings;
        Ok(GenerationResult {
            images: vec![GeneratedImage {
                url: format!("mock://{}/generated.png", self.provider_id),
                width: None,
                height: None,
            }],
            revised_prompt: None,
            cost: None,
            latency_ms: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GenerationSettings {
        GenerationSettings { provider: "mock".to_string(), quality: None, size: None, steps: None }
    }

    #[tokio::test]
    async fn generate_succeeds_with_one_placeholder_image() {
        let adapter = MockAdapter::new("mock");
        let result = adapter.generate("positive", "negative", &settings()).await.unwrap();
        assert_eq!(result.images.len(), 1);
    }

    #[tokio::test]
    async fn failing_adapter_surfaces_the_configured_error_kind() {
        let adapter = MockAdapter::failing("mock", ProviderErrorKind::RateLimited);
        let err = adapter.generate("positive", "negative", &settings()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    }
}
