//! Portfolios and their source images.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioStatus {
    Pending,
    Ingesting,
    Analyzing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub image_count: i32,
    pub status: PortfolioStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Portfolio {
    pub fn new(owner_id: Uuid, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            image_count: 0,
            status: PortfolioStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One source image. `(portfolio_id, content_hash)` is unique within a
/// portfolio, which gives upload-time deduplication for free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioImage {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub content_hash: String,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl PortfolioImage {
    /// Stable content identity for dedup, matching the extractor's
    /// idempotency story: the same bytes never get a second descriptor.
    pub fn hash_bytes(bytes: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_bytes_is_stable_and_content_addressed() {
        let a = PortfolioImage::hash_bytes(b"same image bytes");
        let b = PortfolioImage::hash_bytes(b"same image bytes");
        let c = PortfolioImage::hash_bytes(b"different image bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
