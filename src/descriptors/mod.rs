//! Descriptor Extractor (§4.1): the vision-model adapter boundary, prompt
//! construction, response parsing/scoring, and the extractor itself.

pub mod extractor;
pub mod parsing;
pub mod prompt;
pub mod vision_adapter;

pub use extractor::{
    DescriptorExtractor, ExtractionProgress, ImageOutcome, NullQualityLogSink, QualityLogSink,
};
pub use vision_adapter::{ScriptedVisionAdapter, VisionAdapter, VisionAdapterError, VisionRequest, VisionResponse};
