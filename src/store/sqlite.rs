//! Default SQLite-backed store (§6.4), grounded on the teacher's
//! `memory/storage/ltm_sqlite_storage.rs`: a sync `rusqlite::Connection`
//! guarded by a mutex, driven from async callers via
//! `tokio::task::spawn_blocking`, with `CREATE TABLE IF NOT EXISTS` schema
//! init on construction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::errors::StorageError;
use crate::types::{
    ContextualAttributes, DescriptorMetadata, ExecutiveSummary, FeedbackEvent, FeedbackType,
    Generation, GenerationAsset, GenerationStatus, ModelDemographics, Photography, Portfolio,
    PortfolioImage, PortfolioStatus, StyleProfile, TokenWeight, UltraDetailedDescriptor,
};
use crate::types::StylingContext;

use super::{
    DescriptorStore, FeedbackLog, GenerationStore, PortfolioStore, QualityLogStore,
    StyleProfileStore, TokenWeightStore,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS portfolios (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    image_count INTEGER NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS portfolio_images (
    id TEXT PRIMARY KEY,
    portfolio_id TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    width INTEGER,
    height INTEGER,
    uploaded_at TEXT NOT NULL,
    UNIQUE(portfolio_id, content_hash)
);

CREATE TABLE IF NOT EXISTS ultra_detailed_descriptors (
    id TEXT PRIMARY KEY,
    image_id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL,
    executive_summary TEXT NOT NULL,
    garments TEXT NOT NULL,
    model_demographics TEXT NOT NULL,
    photography TEXT NOT NULL,
    styling_context TEXT NOT NULL,
    contextual_attributes TEXT NOT NULL,
    metadata TEXT NOT NULL,
    overall_confidence REAL NOT NULL,
    completeness_percentage REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS image_failures (
    image_id TEXT PRIMARY KEY,
    reason TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quality_log (
    id TEXT PRIMARY KEY,
    image_id TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS style_profiles (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE,
    portfolio_id TEXT NOT NULL,
    distributions TEXT NOT NULL,
    aesthetic_themes TEXT NOT NULL,
    construction_patterns TEXT NOT NULL,
    signature_pieces TEXT NOT NULL,
    style_tags TEXT NOT NULL,
    garment_types TEXT NOT NULL,
    style_description TEXT NOT NULL,
    avg_confidence REAL NOT NULL,
    avg_completeness REAL NOT NULL,
    photography_preferences TEXT NOT NULL,
    model_gender_preference TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS token_weights (
    user_id TEXT NOT NULL,
    category TEXT NOT NULL,
    token TEXT NOT NULL,
    weight REAL NOT NULL,
    usage_count INTEGER NOT NULL,
    positive_feedback INTEGER NOT NULL,
    negative_feedback INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, category, token)
);

CREATE TABLE IF NOT EXISTS feedback_events (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    image_id TEXT NOT NULL,
    generation_id TEXT NOT NULL,
    type TEXT NOT NULL,
    tokens_used TEXT NOT NULL,
    reward REAL NOT NULL,
    time_viewed_ms INTEGER,
    created_at TEXT NOT NULL,
    idempotency_key TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS generations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    prompt_text TEXT NOT NULL,
    negative_prompt TEXT NOT NULL,
    metadata TEXT NOT NULL,
    provider_id TEXT NOT NULL,
    status TEXT NOT NULL,
    cost REAL,
    created_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS generation_assets (
    id TEXT PRIMARY KEY,
    generation_id TEXT NOT NULL,
    url TEXT NOT NULL,
    prompt_index INTEGER NOT NULL,
    provider_id TEXT NOT NULL,
    file_size INTEGER,
    created_at TEXT NOT NULL
);
"#;

/// Connection-holding store implementing every persistence trait this
/// crate needs. Cheap to clone (shares the same connection via `Arc`).
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| StorageError(format!("blocking task panicked: {e}")))?
    }
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError(format!("invalid timestamp {s}: {e}")))
}

fn json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, StorageError> {
    serde_json::from_str(text).map_err(|e| StorageError(e.to_string()))
}

#[async_trait]
impl PortfolioStore for SqliteStore {
    async fn create_portfolio(&self, portfolio: &Portfolio) -> Result<(), StorageError> {
        let portfolio = portfolio.clone();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO portfolios (id, user_id, title, image_count, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    portfolio.id.to_string(),
                    portfolio.owner_id.to_string(),
                    portfolio.title,
                    portfolio.image_count,
                    status_to_str(portfolio.status),
                    ts(portfolio.created_at),
                    ts(portfolio.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_portfolio(&self, portfolio_id: Uuid) -> Result<Option<Portfolio>, StorageError> {
        self.run_blocking(move |conn| {
            conn.query_row(
                "SELECT id, user_id, title, image_count, status, created_at, updated_at
                 FROM portfolios WHERE id = ?1",
                params![portfolio_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i32>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?
            .map(|(id, user_id, title, image_count, status, created_at, updated_at)| {
                Ok(Portfolio {
                    id: parse_uuid(&id)?,
                    owner_id: parse_uuid(&user_id)?,
                    title,
                    image_count,
                    status: status_from_str(&status),
                    created_at: parse_ts(&created_at)?,
                    updated_at: parse_ts(&updated_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn update_portfolio(&self, portfolio: &Portfolio) -> Result<(), StorageError> {
        let portfolio = portfolio.clone();
        self.run_blocking(move |conn| {
            conn.execute(
                "UPDATE portfolios SET title=?2, image_count=?3, status=?4, updated_at=?5 WHERE id=?1",
                params![
                    portfolio.id.to_string(),
                    portfolio.title,
                    portfolio.image_count,
                    status_to_str(portfolio.status),
                    ts(portfolio.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn add_image(&self, image: &PortfolioImage) -> Result<(), StorageError> {
        let image = image.clone();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO portfolio_images (id, portfolio_id, content_hash, url, width, height, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    image.id.to_string(),
                    image.portfolio_id.to_string(),
                    image.content_hash,
                    image.url,
                    image.width,
                    image.height,
                    ts(image.uploaded_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_images(&self, portfolio_id: Uuid) -> Result<Vec<PortfolioImage>, StorageError> {
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, portfolio_id, content_hash, url, width, height, uploaded_at
                 FROM portfolio_images WHERE portfolio_id = ?1",
            )?;
            let rows = stmt
                .query_map(params![portfolio_id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<u32>>(4)?,
                        row.get::<_, Option<u32>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, portfolio_id, content_hash, url, width, height, uploaded_at)| {
                    Ok(PortfolioImage {
                        id: parse_uuid(&id)?,
                        portfolio_id: parse_uuid(&portfolio_id)?,
                        content_hash,
                        url,
                        width,
                        height,
                        uploaded_at: parse_ts(&uploaded_at)?,
                    })
                })
                .collect()
        })
        .await
    }
}

#[async_trait]
impl DescriptorStore for SqliteStore {
    async fn put(&self, descriptor: &UltraDetailedDescriptor) -> Result<(), StorageError> {
        let d = descriptor.clone();
        let executive_summary = json(&d.executive_summary)?;
        let garments = json(&d.garments)?;
        let model_demographics = json(&d.model_demographics)?;
        let photography = json(&d.photography)?;
        let styling_context = json(&d.styling_context)?;
        let contextual_attributes = json(&d.contextual_attributes)?;
        let metadata = json(&d.metadata)?;

        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO ultra_detailed_descriptors
                 (id, image_id, user_id, executive_summary, garments, model_demographics, photography,
                  styling_context, contextual_attributes, metadata, overall_confidence, completeness_percentage, created_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
                 ON CONFLICT(image_id) DO UPDATE SET
                    executive_summary=excluded.executive_summary,
                    garments=excluded.garments,
                    model_demographics=excluded.model_demographics,
                    photography=excluded.photography,
                    styling_context=excluded.styling_context,
                    contextual_attributes=excluded.contextual_attributes,
                    metadata=excluded.metadata,
                    overall_confidence=excluded.overall_confidence,
                    completeness_percentage=excluded.completeness_percentage",
                params![
                    d.id.to_string(),
                    d.image_id.to_string(),
                    d.user_id.to_string(),
                    executive_summary,
                    garments,
                    model_demographics,
                    photography,
                    styling_context,
                    contextual_attributes,
                    metadata,
                    d.overall_confidence,
                    d.completeness_percentage,
                    ts(d.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn mark_image_failed(&self, image_id: Uuid, reason: &str) -> Result<(), StorageError> {
        let reason = reason.to_string();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO image_failures (image_id, reason, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(image_id) DO UPDATE SET reason=excluded.reason, created_at=excluded.created_at",
                params![image_id.to_string(), reason, ts(Utc::now())],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_for_portfolio(
        &self,
        _portfolio_id: Uuid,
        images: &[PortfolioImage],
    ) -> Result<Vec<UltraDetailedDescriptor>, StorageError> {
        let image_ids: Vec<String> = images.iter().map(|i| i.id.to_string()).collect();
        self.run_blocking(move |conn| {
            let mut out = Vec::new();
            for image_id in &image_ids {
                let row = conn
                    .query_row(
                        "SELECT id, image_id, user_id, executive_summary, garments, model_demographics,
                                photography, styling_context, contextual_attributes, metadata,
                                overall_confidence, completeness_percentage, created_at
                         FROM ultra_detailed_descriptors WHERE image_id = ?1",
                        params![image_id],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, String>(4)?,
                                row.get::<_, String>(5)?,
                                row.get::<_, String>(6)?,
                                row.get::<_, String>(7)?,
                                row.get::<_, String>(8)?,
                                row.get::<_, String>(9)?,
                                row.get::<_, f64>(10)?,
                                row.get::<_, f64>(11)?,
                                row.get::<_, String>(12)?,
                            ))
                        },
                    )
                    .optional()?;

                if let Some((
                    id,
                    image_id,
                    user_id,
                    executive_summary,
                    garments,
                    model_demographics,
                    photography,
                    styling_context,
                    contextual_attributes,
                    metadata,
                    overall_confidence,
                    completeness_percentage,
                    created_at,
                )) = row
                {
                    out.push(UltraDetailedDescriptor {
                        id: parse_uuid(&id)?,
                        image_id: parse_uuid(&image_id)?,
                        user_id: parse_uuid(&user_id)?,
                        executive_summary: from_json::<ExecutiveSummary>(&executive_summary)?,
                        garments: from_json(&garments)?,
                        model_demographics: from_json::<ModelDemographics>(&model_demographics)?,
                        photography: from_json::<Photography>(&photography)?,
                        styling_context: from_json::<StylingContext>(&styling_context)?,
                        contextual_attributes: from_json::<ContextualAttributes>(&contextual_attributes)?,
                        metadata: from_json::<DescriptorMetadata>(&metadata)?,
                        overall_confidence,
                        completeness_percentage,
                        created_at: parse_ts(&created_at)?,
                    });
                }
            }
            Ok(out)
        })
        .await
    }
}

#[async_trait]
impl QualityLogStore for SqliteStore {
    async fn record(&self, image_id: Uuid, reason: &str) -> Result<(), StorageError> {
        let reason = reason.to_string();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO quality_log (id, image_id, reason, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![Uuid::new_v4().to_string(), image_id.to_string(), reason, ts(Utc::now())],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl StyleProfileStore for SqliteStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<StyleProfile>, StorageError> {
        self.run_blocking(move |conn| {
            conn.query_row(
                "SELECT id, user_id, portfolio_id, distributions, aesthetic_themes, construction_patterns,
                        signature_pieces, style_tags, garment_types, style_description, avg_confidence,
                        avg_completeness, photography_preferences, model_gender_preference, updated_at
                 FROM style_profiles WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, String>(9)?,
                        row.get::<_, f64>(10)?,
                        row.get::<_, f64>(11)?,
                        row.get::<_, String>(12)?,
                        row.get::<_, String>(13)?,
                        row.get::<_, String>(14)?,
                    ))
                },
            )
            .optional()?
            .map(
                |(
                    id,
                    user_id,
                    portfolio_id,
                    distributions,
                    aesthetic_themes,
                    construction_patterns,
                    signature_pieces,
                    style_tags,
                    garment_types,
                    style_description,
                    avg_confidence,
                    avg_completeness,
                    photography_preferences,
                    model_gender_preference,
                    updated_at,
                )| {
                    Ok(StyleProfile {
                        id: parse_uuid(&id)?,
                        user_id: parse_uuid(&user_id)?,
                        portfolio_id: parse_uuid(&portfolio_id)?,
                        distributions: from_json(&distributions)?,
                        aesthetic_themes: from_json(&aesthetic_themes)?,
                        construction_patterns: from_json(&construction_patterns)?,
                        signature_pieces: from_json(&signature_pieces)?,
                        style_tags: from_json(&style_tags)?,
                        garment_types: from_json(&garment_types)?,
                        style_description,
                        avg_confidence,
                        avg_completeness,
                        photography_preferences: from_json(&photography_preferences)?,
                        model_gender_preference: from_json(&model_gender_preference)?,
                        updated_at: parse_ts(&updated_at)?,
                    })
                },
            )
            .transpose()
        })
        .await
    }

    async fn upsert(&self, profile: &StyleProfile) -> Result<(), StorageError> {
        let p = profile.clone();
        let distributions = json(&p.distributions)?;
        let aesthetic_themes = json(&p.aesthetic_themes)?;
        let construction_patterns = json(&p.construction_patterns)?;
        let signature_pieces = json(&p.signature_pieces)?;
        let style_tags = json(&p.style_tags)?;
        let garment_types = json(&p.garment_types)?;
        let photography_preferences = json(&p.photography_preferences)?;
        let model_gender_preference = json(&p.model_gender_preference)?;

        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO style_profiles
                 (id, user_id, portfolio_id, distributions, aesthetic_themes, construction_patterns,
                  signature_pieces, style_tags, garment_types, style_description, avg_confidence,
                  avg_completeness, photography_preferences, model_gender_preference, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)
                 ON CONFLICT(user_id) DO UPDATE SET
                    portfolio_id=excluded.portfolio_id,
                    distributions=excluded.distributions,
                    aesthetic_themes=excluded.aesthetic_themes,
                    construction_patterns=excluded.construction_patterns,
                    signature_pieces=excluded.signature_pieces,
                    style_tags=excluded.style_tags,
                    garment_types=excluded.garment_types,
                    style_description=excluded.style_description,
                    avg_confidence=excluded.avg_confidence,
                    avg_completeness=excluded.avg_completeness,
                    photography_preferences=excluded.photography_preferences,
                    model_gender_preference=excluded.model_gender_preference,
                    updated_at=excluded.updated_at",
                params![
                    p.id.to_string(),
                    p.user_id.to_string(),
                    p.portfolio_id.to_string(),
                    distributions,
                    aesthetic_themes,
                    construction_patterns,
                    signature_pieces,
                    style_tags,
                    garment_types,
                    p.style_description,
                    p.avg_confidence,
                    p.avg_completeness,
                    photography_preferences,
                    model_gender_preference,
                    ts(p.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TokenWeightStore for SqliteStore {
    async fn get(&self, user_id: Uuid, category: &str, token: &str) -> Result<Option<TokenWeight>, StorageError> {
        let category = category.to_string();
        let token = token.to_string();
        self.run_blocking(move |conn| {
            conn.query_row(
                "SELECT user_id, category, token, weight, usage_count, positive_feedback, negative_feedback, updated_at
                 FROM token_weights WHERE user_id=?1 AND category=?2 AND token=?3",
                params![user_id.to_string(), category, token],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?
            .map(|(user_id, category, token, weight, usage_count, positive, negative, updated_at)| {
                Ok(TokenWeight {
                    user_id: parse_uuid(&user_id)?,
                    category,
                    token,
                    weight,
                    usage_count: usage_count as u64,
                    positive_feedback: positive as u64,
                    negative_feedback: negative as u64,
                    updated_at: parse_ts(&updated_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn get_all(&self, user_id: Uuid, category: Option<&str>) -> Result<Vec<TokenWeight>, StorageError> {
        let category = category.map(|c| c.to_string());
        self.run_blocking(move |conn| {
            type Row = (String, String, String, f64, i64, i64, i64, String);

            let raw_rows: Vec<Row> = match &category {
                Some(category) => {
                    let mut stmt = conn.prepare(
                        "SELECT user_id, category, token, weight, usage_count, positive_feedback, negative_feedback, updated_at
                         FROM token_weights WHERE user_id=?1 AND category=?2",
                    )?;
                    stmt.query_map(params![user_id.to_string(), category], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, f64>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, i64>(6)?,
                            row.get::<_, String>(7)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT user_id, category, token, weight, usage_count, positive_feedback, negative_feedback, updated_at
                         FROM token_weights WHERE user_id=?1",
                    )?;
                    stmt.query_map(params![user_id.to_string()], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, f64>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, i64>(6)?,
                            row.get::<_, String>(7)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?
                }
            };

            raw_rows
                .into_iter()
                .map(|(user_id, category, token, weight, usage_count, positive, negative, updated_at)| {
                    Ok(TokenWeight {
                        user_id: parse_uuid(&user_id)?,
                        category,
                        token,
                        weight,
                        usage_count: usage_count as u64,
                        positive_feedback: positive as u64,
                        negative_feedback: negative as u64,
                        updated_at: parse_ts(&updated_at)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn put(&self, weight: &TokenWeight) -> Result<(), StorageError> {
        let w = weight.clone();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO token_weights (user_id, category, token, weight, usage_count, positive_feedback, negative_feedback, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
                 ON CONFLICT(user_id, category, token) DO UPDATE SET
                    weight=excluded.weight,
                    usage_count=excluded.usage_count,
                    positive_feedback=excluded.positive_feedback,
                    negative_feedback=excluded.negative_feedback,
                    updated_at=excluded.updated_at",
                params![
                    w.user_id.to_string(),
                    w.category,
                    w.token,
                    w.weight,
                    w.usage_count as i64,
                    w.positive_feedback as i64,
                    w.negative_feedback as i64,
                    ts(w.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl FeedbackLog for SqliteStore {
    async fn append(&self, event: &FeedbackEvent) -> Result<(), StorageError> {
        let e = event.clone();
        let tokens_used = json(&e.tokens_used)?;
        let key = e.idempotency_key();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO feedback_events (id, user_id, image_id, generation_id, type, tokens_used, reward, time_viewed_ms, created_at, idempotency_key)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
                params![
                    e.id.to_string(),
                    e.user_id.to_string(),
                    e.image_id.to_string(),
                    e.generation_id.to_string(),
                    feedback_type_to_str(e.feedback_type),
                    tokens_used,
                    e.reward,
                    e.time_viewed_ms.map(|v| v as i64),
                    ts(e.created_at),
                    key,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn recent_duplicate(
        &self,
        idempotency_key: &str,
        window: Duration,
    ) -> Result<Option<FeedbackEvent>, StorageError> {
        let key = idempotency_key.to_string();
        let cutoff = ts(Utc::now() - chrono::Duration::from_std(window).unwrap_or_default());
        self.run_blocking(move |conn| {
            conn.query_row(
                "SELECT id, user_id, image_id, generation_id, type, tokens_used, reward, time_viewed_ms, created_at
                 FROM feedback_events WHERE idempotency_key = ?1 AND created_at >= ?2
                 ORDER BY created_at DESC LIMIT 1",
                params![key, cutoff],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, Option<i64>>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?
            .map(
                |(id, user_id, image_id, generation_id, feedback_type, tokens_used, reward, time_viewed_ms, created_at)| {
                    Ok(FeedbackEvent {
                        id: parse_uuid(&id)?,
                        user_id: parse_uuid(&user_id)?,
                        image_id: parse_uuid(&image_id)?,
                        generation_id: parse_uuid(&generation_id)?,
                        feedback_type: feedback_type_from_str(&feedback_type),
                        tokens_used: from_json(&tokens_used)?,
                        time_viewed_ms: time_viewed_ms.map(|v| v as u64),
                        reward,
                        created_at: parse_ts(&created_at)?,
                    })
                },
            )
            .transpose()
        })
        .await
    }
}

#[async_trait]
impl GenerationStore for SqliteStore {
    async fn create(&self, generation: &Generation) -> Result<(), StorageError> {
        let g = generation.clone();
        let metadata = json(&g.metadata)?;
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO generations (id, user_id, prompt_text, negative_prompt, metadata, provider_id, status, cost, created_at, completed_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
                params![
                    g.id.to_string(),
                    g.user_id.to_string(),
                    g.prompt_text,
                    g.negative_prompt,
                    metadata,
                    g.provider_id,
                    generation_status_to_str(g.status),
                    g.cost,
                    ts(g.created_at),
                    g.completed_at.map(ts),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn update(&self, generation: &Generation) -> Result<(), StorageError> {
        let g = generation.clone();
        self.run_blocking(move |conn| {
            conn.execute(
                "UPDATE generations SET status=?2, cost=?3, completed_at=?4 WHERE id=?1",
                params![
                    g.id.to_string(),
                    generation_status_to_str(g.status),
                    g.cost,
                    g.completed_at.map(ts),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn add_asset(&self, asset: &GenerationAsset) -> Result<(), StorageError> {
        let a = asset.clone();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO generation_assets (id, generation_id, url, prompt_index, provider_id, file_size, created_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    a.id.to_string(),
                    a.generation_id.to_string(),
                    a.url,
                    a.prompt_index,
                    a.provider_id,
                    a.file_size.map(|v| v as i64),
                    ts(a.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(s).map_err(|e| StorageError(format!("invalid uuid {s}: {e}")))
}

fn status_to_str(status: PortfolioStatus) -> &'static str {
    match status {
        PortfolioStatus::Pending => "pending",
        PortfolioStatus::Ingesting => "ingesting",
        PortfolioStatus::Analyzing => "analyzing",
        PortfolioStatus::Ready => "ready",
        PortfolioStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> PortfolioStatus {
    match s {
        "ingesting" => PortfolioStatus::Ingesting,
        "analyzing" => PortfolioStatus::Analyzing,
        "ready" => PortfolioStatus::Ready,
        "failed" => PortfolioStatus::Failed,
        _ => PortfolioStatus::Pending,
    }
}

fn generation_status_to_str(status: GenerationStatus) -> &'static str {
    match status {
        GenerationStatus::Pending => "pending",
        GenerationStatus::Processing => "processing",
        GenerationStatus::Completed => "completed",
        GenerationStatus::Failed => "failed",
    }
}

fn feedback_type_to_str(t: FeedbackType) -> &'static str {
    match t {
        FeedbackType::Save => "save",
        FeedbackType::Share => "share",
        FeedbackType::GenerateSimilar => "generate_similar",
        FeedbackType::Dislike => "dislike",
        FeedbackType::Delete => "delete",
        FeedbackType::Like => "like",
        FeedbackType::View => "view",
    }
}

fn feedback_type_from_str(s: &str) -> FeedbackType {
    match s {
        "share" => FeedbackType::Share,
        "generate_similar" => FeedbackType::GenerateSimilar,
        "dislike" => FeedbackType::Dislike,
        "delete" => FeedbackType::Delete,
        "like" => FeedbackType::Like,
        "view" => FeedbackType::View,
        _ => FeedbackType::Save,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Garment;

    fn sample_descriptor(image_id: Uuid, user_id: Uuid) -> UltraDetailedDescriptor {
        UltraDetailedDescriptor {
            id: Uuid::new_v4(),
            image_id,
            user_id,
            executive_summary: ExecutiveSummary::default(),
            garments: vec![Garment::default()],
            model_demographics: ModelDemographics::default(),
            photography: Photography::default(),
            styling_context: StylingContext::default(),
            contextual_attributes: ContextualAttributes::default(),
            metadata: DescriptorMetadata::default(),
            overall_confidence: 0.8,
            completeness_percentage: 80.0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_and_reload_descriptor_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        let image_id = Uuid::new_v4();
        let descriptor = sample_descriptor(image_id, user_id);
        store.put(&descriptor).await.unwrap();

        let image = PortfolioImage {
            id: image_id,
            portfolio_id: Uuid::new_v4(),
            content_hash: "x".into(),
            url: "https://x".into(),
            width: None,
            height: None,
            uploaded_at: Utc::now(),
        };
        let loaded = store.list_for_portfolio(Uuid::new_v4(), &[image]).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].overall_confidence, 0.8);
    }

    #[tokio::test]
    async fn token_weight_upsert_replaces_existing_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        let mut w = TokenWeight::new(user_id, "lighting", "cinematic lighting");
        store.put(&w).await.unwrap();
        w.apply_reward(1.5, 0.1);
        store.put(&w).await.unwrap();

        let loaded = store.get(user_id, "lighting", "cinematic lighting").await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 1);
    }

    #[tokio::test]
    async fn style_profile_upsert_is_idempotent_per_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        let mut profile = StyleProfile {
            id: Uuid::new_v4(),
            user_id,
            portfolio_id: Uuid::new_v4(),
            distributions: Default::default(),
            aesthetic_themes: Vec::new(),
            construction_patterns: Vec::new(),
            signature_pieces: Vec::new(),
            style_tags: Vec::new(),
            garment_types: Vec::new(),
            style_description: "first".into(),
            avg_confidence: 0.5,
            avg_completeness: 50.0,
            photography_preferences: Default::default(),
            model_gender_preference: Default::default(),
            updated_at: Utc::now(),
        };
        store.upsert(&profile).await.unwrap();
        profile.style_description = "second".into();
        store.upsert(&profile).await.unwrap();

        let loaded = store.get(user_id).await.unwrap().unwrap();
        assert_eq!(loaded.style_description, "second");
    }
}
