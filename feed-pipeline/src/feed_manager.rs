use crate::rss_utils::url::is_valid_feed_url;
use crate::types::{FeedConfig, Language, PriorityTier, Result};
use anyhow::Context;
use async_trait::async_trait;
use interfaces::FeedRegistry;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Feed registry over the `feeds` table.
pub struct FeedManager {
    db: PgPool,
}

pub type PgFeedRegistry = FeedManager;

impl FeedManager {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT 'en',
                priority TEXT NOT NULL DEFAULT 'primary',
                poll_interval_minutes INTEGER NOT NULL DEFAULT 30,
                requires_scrape BOOLEAN NOT NULL DEFAULT false,
                is_active BOOLEAN NOT NULL DEFAULT true
            )
            "#,
        )
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Active feeds, primary tier first, then by id.
    pub async fn list_active_feeds(&self) -> Result<Vec<FeedConfig>> {
        let rows = sqlx::query(
            r#"
            SELECT id, url, name, language, priority, poll_interval_minutes, requires_scrape
            FROM feeds
            WHERE is_active = true
            ORDER BY CASE WHEN priority = 'primary' THEN 0 ELSE 1 END, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut feeds = Vec::with_capacity(rows.len());
        for row in rows {
            feeds.push(feed_from_row(&row)?);
        }

        debug!("Loaded {} active feeds", feeds.len());
        Ok(feeds)
    }
}

fn feed_from_row(row: &PgRow) -> Result<FeedConfig> {
    let id: String = row.try_get("id")?;
    let language_tag: String = row.try_get("language")?;
    let priority_name: String = row.try_get("priority")?;

    let language = Language::from_tag(&language_tag).unwrap_or_else(|| {
        warn!("Feed {}: unknown language '{}', using default", id, language_tag);
        Language::default()
    });
    let priority_tier = PriorityTier::from_name(&priority_name).unwrap_or_else(|| {
        warn!("Feed {}: unknown priority '{}', using default", id, priority_name);
        PriorityTier::default()
    });

    Ok(FeedConfig {
        url: row.try_get("url")?,
        display_name: row.try_get("name")?,
        language,
        priority_tier,
        poll_interval_minutes: row.try_get::<i32, _>("poll_interval_minutes")?.max(0) as u32,
        requires_scrape_fallback: row.try_get("requires_scrape")?,
        id,
    })
}

#[async_trait]
impl FeedRegistry for FeedManager {
    async fn list_feeds(&self) -> anyhow::Result<Vec<FeedConfig>> {
        Ok(self.list_active_feeds().await?)
    }
}

/// Registry backed by a JSON array of feed configs on disk.
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedRegistry for JsonFileRegistry {
    async fn list_feeds(&self) -> anyhow::Result<Vec<FeedConfig>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading feed list {}", self.path.display()))?;
        let feeds: Vec<FeedConfig> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing feed list {}", self.path.display()))?;

        let total = feeds.len();
        let feeds: Vec<FeedConfig> = feeds
            .into_iter()
            .filter(|feed| {
                let valid = is_valid_feed_url(&feed.url);
                if !valid {
                    warn!("Skipping feed {}: invalid URL {}", feed.id, feed.url);
                }
                valid
            })
            .collect();

        info!("Loaded {}/{} feeds from {}", feeds.len(), total, self.path.display());
        Ok(feeds)
    }
}
