use crate::config::PipelineConfig;
use crate::rss_utils::url::is_placeholder;
use crate::types::Article;
use crate::utils::text::normalize_title;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// How widely titles are compared when collapsing duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupScope {
    /// Same title from the same source (`source:title`).
    #[default]
    PerSource,
    /// Same title from any source.
    Global,
}

impl DedupScope {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-source" | "source" => Some(DedupScope::PerSource),
            "global" | "title" => Some(DedupScope::Global),
            _ => None,
        }
    }
}

pub fn dedup_key(article: &Article, scope: DedupScope) -> String {
    let title = normalize_title(&article.title);
    // Titles made only of punctuation would all collide
    let title = if title.is_empty() { article.link.clone() } else { title };
    match scope {
        DedupScope::PerSource => format!("{}:{}", article.source, title),
        DedupScope::Global => title,
    }
}

/// A pure post-processing step
pub trait ProcessingStage: Send + Sync {
    fn stage_name(&self) -> &'static str;

    fn process(&self, articles: Vec<Article>, now: DateTime<Utc>) -> Vec<Article>;
}

/// Collapses articles sharing a dedup key. First seen wins, unless only
/// the later one carries a real image.
pub struct DedupStage {
    scope: DedupScope,
}

impl DedupStage {
    pub fn new(scope: DedupScope) -> Self {
        Self { scope }
    }
}

impl ProcessingStage for DedupStage {
    fn stage_name(&self) -> &'static str {
        "dedup"
    }

    fn process(&self, articles: Vec<Article>, _now: DateTime<Utc>) -> Vec<Article> {
        let mut kept: Vec<Article> = Vec::with_capacity(articles.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for article in articles {
            let key = dedup_key(&article, self.scope);
            match positions.get(&key) {
                Some(&position) => {
                    let existing = &mut kept[position];
                    if is_placeholder(&existing.image_url) && !is_placeholder(&article.image_url) {
                        debug!("Replacing duplicate '{}' with imaged copy from {}", article.title, article.source);
                        *existing = article;
                    }
                }
                None => {
                    positions.insert(key, kept.len());
                    kept.push(article);
                }
            }
        }
        kept
    }
}

/// Drops articles published more than `window` before now.
pub struct RecencyStage {
    window: Duration,
}

impl RecencyStage {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl ProcessingStage for RecencyStage {
    fn stage_name(&self) -> &'static str {
        "recency"
    }

    fn process(&self, articles: Vec<Article>, now: DateTime<Utc>) -> Vec<Article> {
        // A window reaching past the earliest representable instant keeps everything
        let Some(cutoff) = now.checked_sub_signed(self.window) else {
            return articles;
        };
        articles
            .into_iter()
            .filter(|article| article.publication_date >= cutoff)
            .collect()
    }
}

/// Newest first; equal timestamps keep their input order.
pub struct SortStage;

impl ProcessingStage for SortStage {
    fn stage_name(&self) -> &'static str {
        "sort"
    }

    fn process(&self, mut articles: Vec<Article>, _now: DateTime<Utc>) -> Vec<Article> {
        articles.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
        articles
    }
}

/// Dedup, recency filter, then sort. Never fails.
pub struct PostProcessor {
    stages: Vec<Box<dyn ProcessingStage>>,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new(DedupScope::default(), Duration::hours(168))
    }
}

impl PostProcessor {
    pub fn new(scope: DedupScope, recency_window: Duration) -> Self {
        Self {
            stages: vec![
                Box::new(DedupStage::new(scope)),
                Box::new(RecencyStage::new(recency_window)),
                Box::new(SortStage),
            ],
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.dedup_scope, config.recency_window)
    }

    pub fn process(&self, articles: Vec<Article>) -> Vec<Article> {
        self.process_at(articles, Utc::now())
    }

    pub fn process_at(&self, articles: Vec<Article>, now: DateTime<Utc>) -> Vec<Article> {
        self.stages.iter().fold(articles, |articles, stage| {
            let before = articles.len();
            let after = stage.process(articles, now);
            debug!("Stage {}: {} -> {} articles", stage.stage_name(), before, after.len());
            after
        })
    }
}
