//! The Descriptor Extractor (§4.1): turns one portfolio image into an
//! `UltraDetailedDescriptor`, then fans that out across a whole portfolio
//! with bounded concurrency and per-image failure containment.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::errors::ExtractionFailure;
use crate::retry::retry_with_backoff;
use crate::types::{PortfolioImage, UltraDetailedDescriptor};

use super::parsing::{completeness_percentage, overall_confidence, parse_descriptor_json, RawDescriptorJson};
use super::prompt::{build_extraction_prompt, build_retry_prompt};
use super::vision_adapter::{VisionAdapter, VisionAdapterError, VisionRequest};

/// Emitted as a portfolio works through analysis. `percentage` is
/// monotonically non-decreasing across the calls for one
/// `analyze_portfolio` invocation (§4.1 step 7).
#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
    pub message: String,
    pub avg_confidence_so_far: f64,
}

/// Sink for descriptors that fell below the quality floor
/// (`is_low_quality`), kept distinct from storage so a deployment can wire
/// it to a review queue instead of (or in addition to) the database.
/// `reason` is a short machine-checkable code (e.g. `low_confidence_retry`,
/// `below_quality_floor`), not a free-form message (§4.1/§7).
#[async_trait]
pub trait QualityLogSink: Send + Sync {
    async fn record_low_quality(&self, descriptor: &UltraDetailedDescriptor, reason: &str);
}

/// No-op sink for deployments that don't want a review queue.
pub struct NullQualityLogSink;

#[async_trait]
impl QualityLogSink for NullQualityLogSink {
    async fn record_low_quality(&self, _descriptor: &UltraDetailedDescriptor, _reason: &str) {}
}

/// One image's outcome within a portfolio analysis run. Failures never
/// abort the batch (§4.1 step 8) -- they're reported alongside successes.
pub enum ImageOutcome {
    Descriptor(UltraDetailedDescriptor),
    Failed { image_id: Uuid, reason: String },
}

pub struct DescriptorExtractor<V: VisionAdapter> {
    vision: Arc<V>,
    quality_log: Arc<dyn QualityLogSink>,
    config: CoreConfig,
}

impl<V: VisionAdapter> DescriptorExtractor<V> {
    pub fn new(vision: Arc<V>, quality_log: Arc<dyn QualityLogSink>, config: CoreConfig) -> Self {
        Self {
            vision,
            quality_log,
            config,
        }
    }

    /// Analyze a single image (§4.1 steps 1-6): submit the structured
    /// prompt, parse with one repair attempt, retry once with a stricter
    /// prompt if confidence or completeness falls below the floor, and
    /// keep whichever attempt scores higher.
    pub async fn analyze_image(
        &self,
        image: &PortfolioImage,
        user_id: Uuid,
    ) -> Result<UltraDetailedDescriptor, ExtractionFailure> {
        let first = self.run_extraction_attempt(image, user_id, None).await?;

        if !first.is_low_quality() {
            return Ok(first);
        }

        self.quality_log.record_low_quality(&first, "low_confidence_retry").await;

        let previous_json = serde_json::to_string(&first).unwrap_or_default();
        let weaknesses = weaknesses_of(&first);
        let retry = self
            .run_extraction_attempt(image, user_id, Some((previous_json, weaknesses)))
            .await;

        let mut best = match retry {
            Ok(second) if second.retry_score() >= first.retry_score() => second,
            Ok(_) | Err(_) => first,
        };
        best.clamp_quality();

        if best.is_low_quality() {
            self.quality_log.record_low_quality(&best, "below_quality_floor").await;
        }

        Ok(best)
    }

    async fn run_extraction_attempt(
        &self,
        image: &PortfolioImage,
        user_id: Uuid,
        retry_context: Option<(String, Vec<String>)>,
    ) -> Result<UltraDetailedDescriptor, ExtractionFailure> {
        let prompt = match &retry_context {
            None => build_extraction_prompt(),
            Some((previous_json, weaknesses)) => build_retry_prompt(previous_json, weaknesses),
        };

        let request = VisionRequest {
            image_url: image.url.clone(),
            prompt,
        };

        let response = retry_with_backoff(
            self.config.backoff_base,
            self.config.backoff_factor,
            self.config.backoff_max_attempts,
            is_retryable_vision_error,
            || {
                let vision = Arc::clone(&self.vision);
                let request = request.clone();
                async move { vision.analyze(request).await }
            },
        )
        .await
        .map_err(|e| ExtractionFailure {
            image_id: image.id,
            reason: e.to_string(),
        })?;

        let raw = parse_descriptor_json(&response.raw_text).map_err(|e| ExtractionFailure {
            image_id: image.id,
            reason: e.to_string(),
        })?;

        Ok(descriptor_from_raw(raw, image.id, user_id))
    }

    /// Analyze every image in a portfolio. Per-image failures are
    /// contained and reported as `ImageOutcome::Failed`; the batch itself
    /// always completes. Concurrency is bounded by
    /// `CoreConfig::extraction_concurrency`.
    ///
    /// A cancelled token stops dispatching new image tasks at the next
    /// scheduling boundary; tasks already dispatched still run to
    /// completion and are included in the returned outcomes (§5).
    pub async fn analyze_portfolio(
        &self,
        images: &[PortfolioImage],
        user_id: Uuid,
        mut on_progress: impl FnMut(ExtractionProgress),
    ) -> Vec<ImageOutcome>
    where
        V: 'static,
    {
        self.analyze_portfolio_cancellable(images, user_id, CancellationToken::new(), &mut on_progress)
            .await
    }

    pub async fn analyze_portfolio_cancellable(
        &self,
        images: &[PortfolioImage],
        user_id: Uuid,
        cancellation: CancellationToken,
        mut on_progress: impl FnMut(ExtractionProgress),
    ) -> Vec<ImageOutcome>
    where
        V: 'static,
    {
        let total = images.len();
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.extraction_concurrency.max(1)));
        let mut tasks = Vec::with_capacity(total);

        for image in images {
            if cancellation.is_cancelled() {
                break;
            }

            let semaphore = Arc::clone(&semaphore);
            let vision = Arc::clone(&self.vision);
            let quality_log = Arc::clone(&self.quality_log);
            let config = self.config.clone();
            let image = image.clone();

            tasks.push(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let extractor = DescriptorExtractor {
                    vision,
                    quality_log,
                    config,
                };
                match extractor.analyze_image(&image, user_id).await {
                    Ok(descriptor) => ImageOutcome::Descriptor(descriptor),
                    Err(e) => ImageOutcome::Failed {
                        image_id: e.image_id,
                        reason: e.reason,
                    },
                }
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut confidences = Vec::new();
        let mut completed = futures::stream::FuturesUnordered::from_iter(tasks);

        use futures::StreamExt;
        let mut current = 0usize;
        while let Some(outcome) = completed.next().await {
            current += 1;
            if let ImageOutcome::Descriptor(d) = &outcome {
                confidences.push(d.overall_confidence);
            }
            let avg_confidence_so_far = if confidences.is_empty() {
                0.0
            } else {
                confidences.iter().sum::<f64>() / confidences.len() as f64
            };
            on_progress(ExtractionProgress {
                current,
                total,
                percentage: (current as f64 / total.max(1) as f64) * 100.0,
                message: format!("analyzed {current}/{total} images"),
                avg_confidence_so_far,
            });
            outcomes.push(outcome);
        }

        outcomes
    }
}

fn descriptor_from_raw(raw: RawDescriptorJson, image_id: Uuid, user_id: Uuid) -> UltraDetailedDescriptor {
    let overall_confidence = overall_confidence(&raw);
    let completeness_percentage = completeness_percentage(&raw);

    let mut descriptor = UltraDetailedDescriptor {
        id: Uuid::new_v4(),
        image_id,
        user_id,
        executive_summary: raw.executive_summary,
        garments: raw.garments,
        model_demographics: raw.model_demographics,
        photography: raw.photography,
        styling_context: raw.styling_context,
        contextual_attributes: raw.contextual_attributes,
        metadata: raw.metadata,
        overall_confidence,
        completeness_percentage,
        created_at: Utc::now(),
    };
    descriptor.clamp_quality();
    descriptor
}

/// Describe what fell short, for the retry prompt's weakness list.
fn weaknesses_of(descriptor: &UltraDetailedDescriptor) -> Vec<String> {
    let mut weaknesses = Vec::new();
    if descriptor.overall_confidence < 0.70 {
        weaknesses.push(format!(
            "overall confidence was only {:.2}; look more closely at ambiguous garments",
            descriptor.overall_confidence
        ));
    }
    if descriptor.completeness_percentage < 70.0 {
        weaknesses.push(format!(
            "only {:.0}% of fields were populated; fill in every field you can observe, using null only when truly not visible",
            descriptor.completeness_percentage
        ));
    }
    if weaknesses.is_empty() {
        weaknesses.push("overall quality was below the required bar".to_string());
    }
    weaknesses
}

fn is_retryable_vision_error(err: &VisionAdapterError) -> bool {
    matches!(
        err,
        VisionAdapterError::Network(_) | VisionAdapterError::RateLimited { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::vision_adapter::ScriptedVisionAdapter;

    fn good_json() -> &'static str {
        r#"{
            "executive_summary": {"one_sentence_description": "a tailored wool blazer", "dominant_aesthetic": "minimalist"},
            "garments": [{"garment_type": "blazer", "confidence": 0.9, "silhouette": {"overall_shape": "boxy", "fit": "relaxed"}, "fabric": {"primary_material": "wool", "weight": "heavy", "drape": "structured", "finish": "matte"}, "construction": {"seams": "flat-felled", "stitching": "topstitched", "closures": "single button", "hardware": "horn"}}],
            "model_demographics": {"ethnicity": "not_visible", "body_type": "athletic", "proportions": "tall", "gender_presentation": "feminine"},
            "photography": {"shot_composition": {"shot_type": "full body"}, "pose": {"gaze": "direct", "head": "level", "body_position": "three-quarter"}, "lighting": {"lighting_type": "studio softbox", "direction": "front"}, "camera_angle": {"horizontal": "straight", "vertical": "eye-level"}, "background": {"background_type": "seamless white"}},
            "styling_context": {"accessories": ["leather belt"], "styling_approach": "tailored minimal", "overall_aesthetic": "quiet luxury"},
            "contextual_attributes": {"mood_aesthetic": "confident", "season": "fall", "occasion": "office"},
            "metadata": {"model_id": "vision-v1", "prompt_version": "v1"}
        }"#
    }

    fn low_quality_json() -> &'static str {
        r#"{"garments":[{"garment_type":"dress","confidence":0.3}]}"#
    }

    fn sample_image() -> PortfolioImage {
        PortfolioImage {
            id: Uuid::new_v4(),
            portfolio_id: Uuid::new_v4(),
            content_hash: "abc".into(),
            url: "https://example.test/img.jpg".into(),
            width: Some(800),
            height: Some(1200),
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn analyze_image_accepts_a_high_quality_first_attempt() {
        let vision = Arc::new(ScriptedVisionAdapter::new());
        vision.push_ok(good_json(), 200);
        let extractor = DescriptorExtractor::new(vision, Arc::new(NullQualityLogSink), CoreConfig::default());

        let descriptor = extractor
            .analyze_image(&sample_image(), Uuid::new_v4())
            .await
            .unwrap();

        assert!(!descriptor.is_low_quality());
        assert_eq!(descriptor.garments[0].garment_type.as_deref(), Some("blazer"));
    }

    #[tokio::test]
    async fn analyze_image_retries_once_and_keeps_the_better_attempt() {
        let vision = Arc::new(ScriptedVisionAdapter::new());
        vision.push_ok(low_quality_json(), 100);
        vision.push_ok(good_json(), 150);
        let extractor = DescriptorExtractor::new(vision, Arc::new(NullQualityLogSink), CoreConfig::default());

        let descriptor = extractor
            .analyze_image(&sample_image(), Uuid::new_v4())
            .await
            .unwrap();

        assert!(!descriptor.is_low_quality());
    }

    /// Spy sink recording every `(reason, descriptor confidence)` pair it
    /// was called with, so tests can assert on the retry-path log entry
    /// independently of the final returned descriptor.
    struct SpyQualityLogSink {
        calls: parking_lot::Mutex<Vec<String>>,
    }

    impl SpyQualityLogSink {
        fn new() -> Self {
            Self { calls: parking_lot::Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl QualityLogSink for SpyQualityLogSink {
        async fn record_low_quality(&self, _descriptor: &UltraDetailedDescriptor, reason: &str) {
            self.calls.lock().push(reason.to_string());
        }
    }

    #[tokio::test]
    async fn scenario_3_a_recovered_retry_still_logs_low_confidence_retry() {
        let vision = Arc::new(ScriptedVisionAdapter::new());
        vision.push_ok(low_quality_json(), 100);
        vision.push_ok(good_json(), 150);
        let sink = Arc::new(SpyQualityLogSink::new());
        let extractor = DescriptorExtractor::new(vision, sink.clone(), CoreConfig::default());

        let descriptor = extractor
            .analyze_image(&sample_image(), Uuid::new_v4())
            .await
            .unwrap();

        assert!(!descriptor.is_low_quality());
        assert_eq!(sink.calls.lock().as_slice(), ["low_confidence_retry"]);
    }

    #[tokio::test]
    async fn analyze_image_falls_back_to_failed_parse_on_garbage() {
        let vision = Arc::new(ScriptedVisionAdapter::new());
        vision.push_ok("not json", 100);
        vision.push_ok("still not json", 100);
        let extractor = DescriptorExtractor::new(vision, Arc::new(NullQualityLogSink), CoreConfig::default());

        let result = extractor.analyze_image(&sample_image(), Uuid::new_v4()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn analyze_portfolio_contains_per_image_failures_without_aborting() {
        let vision = Arc::new(ScriptedVisionAdapter::new());
        vision.push_ok(good_json(), 100);
        vision.push_ok("garbage", 100);
        vision.push_ok("also garbage", 100);
        let extractor = Arc::new(DescriptorExtractor::new(
            vision,
            Arc::new(NullQualityLogSink),
            CoreConfig::default(),
        ));

        let images = vec![sample_image(), sample_image()];
        let mut last_percentage = 0.0;
        let outcomes = extractor
            .analyze_portfolio(&images, Uuid::new_v4(), |p| {
                assert!(p.percentage >= last_percentage);
                last_percentage = p.percentage;
            })
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, ImageOutcome::Descriptor(_))));
        assert!(outcomes.iter().any(|o| matches!(o, ImageOutcome::Failed { .. })));
    }
}
