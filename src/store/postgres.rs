//! Postgres-backed store, stubbed behind the `postgres` feature (§3, §6.4).
//! Only the SQLite backend (`store::sqlite`) is built out in full; this
//! exists so the store traits are genuinely swappable, per the "database
//! driver choice is out of scope" boundary in §1.
//!
//! Schema-equivalent DDL (for reference, not executed by this stub):
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS style_profiles (
//!     id UUID PRIMARY KEY,
//!     user_id UUID NOT NULL UNIQUE,
//!     portfolio_id UUID NOT NULL,
//!     distributions JSONB NOT NULL,
//!     aesthetic_themes JSONB NOT NULL,
//!     construction_patterns JSONB NOT NULL,
//!     signature_pieces JSONB NOT NULL,
//!     style_tags TEXT[] NOT NULL,
//!     garment_types TEXT[] NOT NULL,
//!     style_description TEXT NOT NULL,
//!     avg_confidence NUMERIC(4,3) NOT NULL,
//!     avg_completeness NUMERIC(6,2) NOT NULL,
//!     model_gender_preference JSONB NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! -- token_weights, feedback_events, generations, generation_assets,
//! -- portfolios, portfolio_images, ultra_detailed_descriptors mirror the
//! -- sqlite schema in store::sqlite with UUID/JSONB/TIMESTAMPTZ types.
//! ```

use sqlx::PgPool;

use crate::errors::StorageError;

/// Connects a Postgres pool; trait implementations are left for a
/// deployment that actually needs this backend to fill in, mirroring the
/// sqlite store's method shapes.
pub struct PostgresStore {
    #[allow(dead_code)]
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StorageError(e.to_string()))?;
        Ok(Self { pool })
    }
}
