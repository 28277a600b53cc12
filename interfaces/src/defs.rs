use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Language a feed publishes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// Accepts bare tags and regional variants ("es", "es-ES", "EN_us").
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }
}

/// Informational only; the pipeline treats every tier the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    #[default]
    Primary,
    Secondary,
}

impl PriorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Primary => "primary",
            PriorityTier::Secondary => "secondary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "primary" => Some(PriorityTier::Primary),
            "secondary" => Some(PriorityTier::Secondary),
            _ => None,
        }
    }
}

fn default_poll_interval() -> u32 {
    30
}

/// One configured feed, as handed out by a [`FeedRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    pub id: String,
    pub url: String,
    pub display_name: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub priority_tier: PriorityTier,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u32,
    /// The publisher's feed never embeds usable images.
    #[serde(default)]
    pub requires_scrape_fallback: bool,
}

impl FeedConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            display_name: display_name.into(),
            language: Language::default(),
            priority_tier: PriorityTier::default(),
            poll_interval_minutes: default_poll_interval(),
            requires_scrape_fallback: false,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_priority(mut self, priority_tier: PriorityTier) -> Self {
        self.priority_tier = priority_tier;
        self
    }

    pub fn with_scrape_fallback(mut self, requires_scrape_fallback: bool) -> Self {
        self.requires_scrape_fallback = requires_scrape_fallback;
        self
    }
}

/// Canonical article handed to the front end through the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub source: String,
    pub publication_date: DateTime<Utc>,
    pub summary: String,
    pub link: String,
    pub image_url: String,
    #[serde(default)]
    pub needs_scraping: bool,
    pub language: Language,
}

/// Read accessor over the stored feed configuration.
///
/// Implementations return a snapshot; the pipeline never writes back.
#[async_trait]
pub trait FeedRegistry: Send + Sync {
    async fn list_feeds(&self) -> anyhow::Result<Vec<FeedConfig>>;
}
