//! Persistence traits (§6.4 schema semantics). Two backends: `sqlite`
//! (default, always built) and an optional `postgres` stub behind the
//! `postgres` Cargo feature. Components depend only on these traits, the
//! way the teacher's agents depend on `LongTermMemory`/`ShortTermMemory`
//! rather than a concrete backend.

pub mod sqlite;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StorageError;
use crate::types::{
    FeedbackEvent, Generation, GenerationAsset, Portfolio, PortfolioImage, StyleProfile,
    TokenWeight, UltraDetailedDescriptor,
};

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn create_portfolio(&self, portfolio: &Portfolio) -> Result<(), StorageError>;
    async fn get_portfolio(&self, portfolio_id: Uuid) -> Result<Option<Portfolio>, StorageError>;
    async fn update_portfolio(&self, portfolio: &Portfolio) -> Result<(), StorageError>;
    async fn add_image(&self, image: &PortfolioImage) -> Result<(), StorageError>;
    async fn list_images(&self, portfolio_id: Uuid) -> Result<Vec<PortfolioImage>, StorageError>;
}

#[async_trait]
pub trait DescriptorStore: Send + Sync {
    async fn put(&self, descriptor: &UltraDetailedDescriptor) -> Result<(), StorageError>;
    async fn mark_image_failed(&self, image_id: Uuid, reason: &str) -> Result<(), StorageError>;
    async fn list_for_portfolio(
        &self,
        portfolio_id: Uuid,
        images: &[PortfolioImage],
    ) -> Result<Vec<UltraDetailedDescriptor>, StorageError>;
}

#[async_trait]
pub trait QualityLogStore: Send + Sync {
    async fn record(&self, image_id: Uuid, reason: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait StyleProfileStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<StyleProfile>, StorageError>;
    /// `ON CONFLICT(user_id) DO UPDATE` semantics (§4.2 step 10).
    async fn upsert(&self, profile: &StyleProfile) -> Result<(), StorageError>;
}

#[async_trait]
pub trait TokenWeightStore: Send + Sync {
    async fn get(&self, user_id: Uuid, category: &str, token: &str) -> Result<Option<TokenWeight>, StorageError>;
    async fn get_all(&self, user_id: Uuid, category: Option<&str>) -> Result<Vec<TokenWeight>, StorageError>;
    async fn put(&self, weight: &TokenWeight) -> Result<(), StorageError>;
}

#[async_trait]
pub trait FeedbackLog: Send + Sync {
    async fn append(&self, event: &FeedbackEvent) -> Result<(), StorageError>;
    /// Most recent event sharing `idempotency_key` within `window`, if any
    /// (§4.7's 5-second dedup window).
    async fn recent_duplicate(
        &self,
        idempotency_key: &str,
        window: std::time::Duration,
    ) -> Result<Option<FeedbackEvent>, StorageError>;
}

#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn create(&self, generation: &Generation) -> Result<(), StorageError>;
    async fn update(&self, generation: &Generation) -> Result<(), StorageError>;
    async fn add_asset(&self, asset: &GenerationAsset) -> Result<(), StorageError>;
}
