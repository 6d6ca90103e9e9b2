//! Orchestrator: wires the components into the five public operations a
//! caller drives (§2 Overview, §6.1). Holds `Arc`-shared store/component
//! handles the way the teacher's `Crew` holds its agents and tools, and
//! aggregates component errors into `CoreError` at this boundary.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::descriptors::{DescriptorExtractor, ExtractionProgress, ImageOutcome, QualityLogSink};
use crate::errors::CoreError;
use crate::generator::MockAdapter;
use crate::profile::ProfileSynthesizer;
use crate::prompt::PromptBuilder;
use crate::store::sqlite::SqliteStore;
use crate::store::{DescriptorStore, GenerationStore, PortfolioStore, QualityLogStore};
use crate::types::{
    GenerationSettings, GeneratorAdapter, Portfolio, PortfolioImage, PromptOptions, PromptPackage,
    StyleProfile, UltraDetailedDescriptor,
};
use crate::weights::{FeedbackPayload, WeightStore};
use crate::descriptors::VisionAdapter;

/// Bridges the extractor's `QualityLogSink` (called per low-quality
/// descriptor during a run) to the durable `QualityLogStore`.
struct QualityLogBridge<S: QualityLogStore> {
    store: Arc<S>,
}

#[async_trait]
impl<S: QualityLogStore> QualityLogSink for QualityLogBridge<S> {
    async fn record_low_quality(&self, descriptor: &UltraDetailedDescriptor, reason: &str) {
        let detail = format!(
            "{reason}: confidence={:.3} completeness={:.2}",
            descriptor.overall_confidence, descriptor.completeness_percentage
        );
        let _ = self.store.record(descriptor.image_id, &detail).await;
    }
}

/// The intelligence core's public entry point. Generic over the vision
/// and generator adapters so a deployment can swap either without
/// touching orchestration; the store is the concrete `SqliteStore`
/// backend (§6.4's default persistence layer).
pub struct Orchestrator<V: VisionAdapter, G: GeneratorAdapter> {
    store: Arc<SqliteStore>,
    extractor: DescriptorExtractor<V>,
    synthesizer: ProfileSynthesizer<SqliteStore, SqliteStore>,
    prompt_builder: PromptBuilder<SqliteStore, SqliteStore>,
    weight_store: WeightStore<SqliteStore, SqliteStore>,
    generator: Arc<G>,
    config: CoreConfig,
}

impl<V: VisionAdapter + 'static, G: GeneratorAdapter> Orchestrator<V, G> {
    pub fn new(store: Arc<SqliteStore>, vision: Arc<V>, generator: Arc<G>, config: CoreConfig) -> Self {
        let quality_log = Arc::new(QualityLogBridge { store: store.clone() });
        let extractor = DescriptorExtractor::new(vision, quality_log, config.clone());
        let synthesizer = ProfileSynthesizer::new(store.clone(), store.clone());
        let prompt_builder = PromptBuilder::new(store.clone(), store.clone(), config.clone());
        let weight_store = WeightStore::new(store.clone(), store.clone(), config.clone());

        Self {
            store,
            extractor,
            synthesizer,
            prompt_builder,
            weight_store,
            generator,
            config,
        }
    }

    /// Register a portfolio and its source images (§4.1 entry point).
    pub async fn ingest_portfolio(&self, portfolio: &Portfolio, images: &[PortfolioImage]) -> Result<(), CoreError> {
        self.store.create_portfolio(portfolio).await?;
        for image in images {
            self.store.add_image(image).await?;
        }
        Ok(())
    }

    /// Run the Descriptor Extractor over every image in a portfolio
    /// (§4.1 steps 1-9). Per-image failures are contained and recorded;
    /// the batch always completes.
    pub async fn analyze_portfolio(
        &self,
        portfolio_id: Uuid,
        user_id: Uuid,
        on_progress: impl FnMut(ExtractionProgress),
    ) -> Result<Vec<UltraDetailedDescriptor>, CoreError> {
        self.analyze_portfolio_cancellable(portfolio_id, user_id, CancellationToken::new(), on_progress)
            .await
    }

    /// As `analyze_portfolio`, but dispatching stops at the next scheduling
    /// boundary once `cancellation` fires (§5's cancellation note).
    /// In-flight image analyses complete and their descriptors are kept.
    pub async fn analyze_portfolio_cancellable(
        &self,
        portfolio_id: Uuid,
        user_id: Uuid,
        cancellation: CancellationToken,
        on_progress: impl FnMut(ExtractionProgress),
    ) -> Result<Vec<UltraDetailedDescriptor>, CoreError> {
        let images = self.store.list_images(portfolio_id).await?;
        let outcomes = self
            .extractor
            .analyze_portfolio_cancellable(&images, user_id, cancellation, on_progress)
            .await;

        let mut descriptors = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                ImageOutcome::Descriptor(descriptor) => {
                    self.store.put(&descriptor).await?;
                    descriptors.push(descriptor);
                }
                ImageOutcome::Failed { image_id, reason } => {
                    self.store.mark_image_failed(image_id, &reason).await?;
                }
            }
        }
        Ok(descriptors)
    }

    /// Synthesize (or re-synthesize) a user's style profile from the
    /// descriptors extracted for one portfolio (§4.2).
    pub async fn build_style_profile(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        images: &[PortfolioImage],
    ) -> Result<StyleProfile, CoreError> {
        Ok(self.synthesizer.synthesize(user_id, portfolio_id, images).await?)
    }

    /// Generate one prompt package (§4.4). Callers requesting a batch of
    /// N images call this N times with distinct `variation_seed`s; this
    /// method does not deduplicate across calls.
    pub async fn generate_prompt(&self, user_id: Uuid, options: PromptOptions) -> Result<PromptPackage, CoreError> {
        Ok(self.prompt_builder.generate_prompt(user_id, options).await?)
    }

    /// Record a feedback event and apply its reward to the tokens it
    /// names (§4.7).
    pub async fn submit_feedback(&self, payload: FeedbackPayload) -> Result<(), CoreError> {
        Ok(self.weight_store.process_feedback(payload).await?)
    }

    /// Generate and render a batch of `count` images for one user,
    /// stopping at the next prompt boundary once `cancellation` fires
    /// (§5). Each image gets a distinct `variation_seed`/`generation_index`
    /// so the prompt builder never repeats the same candidate draw.
    pub async fn generate_batch(
        &self,
        user_id: Uuid,
        mut options: PromptOptions,
        settings: &GenerationSettings,
        count: i64,
        cancellation: CancellationToken,
    ) -> Result<Vec<crate::types::GenerationResult>, CoreError> {
        let mut results = Vec::new();
        for index in 0..count {
            if cancellation.is_cancelled() {
                break;
            }
            options.variation_seed = index;
            options.generation_index = index;
            let package = self.generate_prompt(user_id, options.clone()).await?;
            results.push(self.render_image(&package, settings).await?);
        }
        Ok(results)
    }

    /// Dispatch one prompt package to the configured generator provider,
    /// retrying transient failures per §4.8/§7, and persisting the
    /// resulting generation + assets.
    pub async fn render_image(
        &self,
        package: &PromptPackage,
        settings: &GenerationSettings,
    ) -> Result<crate::types::GenerationResult, CoreError> {
        let is_retryable = |err: &crate::types::ProviderError| err.kind.is_retryable();
        let result = crate::retry::retry_with_backoff(
            self.config.backoff_base,
            self.config.backoff_factor,
            self.config.backoff_max_attempts,
            is_retryable,
            || self.generator.generate(&package.positive, &package.negative, settings),
        )
        .await?;

        let generation = crate::types::Generation {
            id: Uuid::new_v4(),
            user_id: package.metadata.user_id,
            prompt_text: package.positive.clone(),
            negative_prompt: package.negative.clone(),
            metadata: serde_json::to_value(&package.metadata).unwrap_or(serde_json::Value::Null),
            provider_id: self.generator.provider_id().to_string(),
            status: crate::types::GenerationStatus::Completed,
            cost: result.cost,
            created_at: chrono::Utc::now(),
            completed_at: Some(chrono::Utc::now()),
        };
        self.store.create(&generation).await?;

        for (index, image) in result.images.iter().enumerate() {
            let asset = crate::types::GenerationAsset {
                id: Uuid::new_v4(),
                generation_id: generation.id,
                url: image.url.clone(),
                prompt_index: index as i32,
                provider_id: generation.provider_id.clone(),
                file_size: None,
                created_at: chrono::Utc::now(),
            };
            self.store.add_asset(&asset).await?;
        }

        Ok(result)
    }
}

/// Convenience constructor for the common case: SQLite persistence, the
/// `MockAdapter` generator, and a caller-supplied vision adapter.
pub fn with_mock_generator<V: VisionAdapter + 'static>(
    store: Arc<SqliteStore>,
    vision: Arc<V>,
    config: CoreConfig,
) -> Orchestrator<V, MockAdapter> {
    Orchestrator::new(store, vision, Arc::new(MockAdapter::new("mock")), config)
}
