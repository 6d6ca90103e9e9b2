//! Shared data model: entities described by semantic role (§3), not by
//! storage type. Every entity here is a plain `serde`-derived struct;
//! persistence concerns live in `crate::store`.

pub mod descriptor;
pub mod feedback;
pub mod generation;
pub mod portfolio;
pub mod profile;
pub mod prompt;
pub mod weights;

pub use descriptor::{
    Background, CameraAngle, ColorSwatch, Construction, ContextualAttributes, DescriptorMetadata,
    ExecutiveSummary, Fabric, Garment, GenderPresentation, Lighting, ModelDemographics,
    Photography, Pose, ShotComposition, Silhouette, StylingContext, UltraDetailedDescriptor,
};
pub use feedback::{resolve_reward, FeedbackEvent, FeedbackType};
pub use generation::{
    CandidateSet, GeneratedImage, Generation, GenerationAsset, GenerationResult,
    GenerationSettings, GenerationStatus, GeneratorAdapter, ProviderError, ProviderErrorKind,
};
pub use portfolio::{Portfolio, PortfolioImage, PortfolioStatus};
pub use profile::{
    AestheticTheme, BrandDna, ConstructionPattern, DetectedGender, Distribution, GenderSetting,
    ModelGenderPreference, SignaturePiece, StyleProfile,
};
pub use prompt::{ChosenTokens, ParsedUserPrompt, PromptMetadata, PromptOptions, PromptPackage};
pub use weights::{TokenCategory, TokenWeight};
