//! The vision-model adapter interface. The extractor depends only on this
//! trait; concrete provider wiring (and its prompt-length quirks, auth,
//! etc.) is out of scope here (§1) and lives outside this crate.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub image_url: String,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct VisionResponse {
    /// Raw text returned by the model -- expected to be JSON, possibly
    /// wrapped in code fences or carrying a trailing comma.
    pub raw_text: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum VisionAdapterError {
    #[error("vision adapter rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("vision adapter network error: {0}")]
    Network(String),
    #[error("vision adapter returned an error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait VisionAdapter: Send + Sync {
    async fn analyze(&self, request: VisionRequest) -> Result<VisionResponse, VisionAdapterError>;
}

/// Deterministic stand-in used in tests and in the default-profile /
/// exploration path when no real provider is wired up. Each call returns
/// a scripted response from a queue.
#[derive(Default)]
pub struct ScriptedVisionAdapter {
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<VisionResponse, VisionAdapterError>>>,
}

impl ScriptedVisionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, raw_text: impl Into<String>, elapsed_ms: u64) {
        self.responses.lock().push_back(Ok(VisionResponse {
            raw_text: raw_text.into(),
            elapsed_ms,
        }));
    }

    pub fn push_err(&self, err: VisionAdapterError) {
        self.responses.lock().push_back(Err(err));
    }
}

#[async_trait]
impl VisionAdapter for ScriptedVisionAdapter {
    async fn analyze(&self, _request: VisionRequest) -> Result<VisionResponse, VisionAdapterError> {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(VisionAdapterError::Provider("no scripted response left".into())))
    }
}
