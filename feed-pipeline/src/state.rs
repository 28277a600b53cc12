use crate::types::{AggregatorError, Article, Result};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interfaces::CacheStore;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{debug, info};

pub const ARTICLES_KEY: &str = "articles";
pub const PREVIEW_KEY: &str = "articles:preview";
pub const MEDIUM_KEY: &str = "articles:medium";
pub const UPDATED_AT_KEY: &str = "articles:updated_at";

pub const PREVIEW_LEN: usize = 16;
pub const MEDIUM_LEN: usize = 64;

/// Publishes processed article lists into a [`CacheStore`] for staged
/// client loading.
pub struct ArticleCache {
    store: Arc<dyn CacheStore>,
}

impl ArticleCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Full list, the preview and medium slices, then the timestamp.
    pub async fn publish(&self, articles: &[Article]) -> Result<()> {
        self.publish_at(articles, Utc::now()).await
    }

    pub async fn publish_at(&self, articles: &[Article], updated_at: DateTime<Utc>) -> Result<()> {
        let slices = [
            (ARTICLES_KEY, articles),
            (PREVIEW_KEY, &articles[..articles.len().min(PREVIEW_LEN)]),
            (MEDIUM_KEY, &articles[..articles.len().min(MEDIUM_LEN)]),
        ];

        for (key, slice) in slices {
            let value = serde_json::to_string(slice)?;
            self.store.put(key, value).await?;
            debug!("Cached {} articles under {}", slice.len(), key);
        }
        self.store.put(UPDATED_AT_KEY, updated_at.to_rfc3339()).await?;

        info!("Published {} articles to cache", articles.len());
        Ok(())
    }

    /// Articles under `key`, or an empty list when nothing was published yet.
    pub async fn load(&self, key: &str) -> Result<Vec<Article>> {
        match self.store.get(key).await? {
            Some(value) => Ok(serde_json::from_str(&value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(UPDATED_AT_KEY).await? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| AggregatorError::Parse(format!("bad {} value: {}", UPDATED_AT_KEY, e)))
    }
}

/// Postgres-backed cache over `cache_entries(key, value, updated_at)`.
pub struct PgCacheStore {
    db: PgPool,
}

impl PgCacheStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the table when missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn put(&self, key: &str, value: String) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .with_context(|| format!("writing cache key {}", key))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM cache_entries WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("reading cache key {}", key))?;
        let value = row.map(|row| row.try_get::<String, _>("value")).transpose()?;
        Ok(value)
    }
}
