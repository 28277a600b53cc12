use crate::aggregator::Aggregator;
use crate::config::PipelineConfig;
use crate::document::DocumentParser;
use crate::processing::PostProcessor;
use crate::state::ArticleCache;
use crate::types::{FeedFailure, Result};
use interfaces::{CacheStore, FeedRegistry};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Summary of one `run_once` call.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub feeds_attempted: usize,
    pub feeds_succeeded: usize,
    pub failures: Vec<FeedFailure>,
    /// Articles gathered before dedup and the recency filter.
    pub articles_collected: usize,
    pub articles_published: usize,
    pub images_scraped: usize,
}

/// Registry snapshot, aggregation, post-processing and cache publication.
/// Runs are not guarded against overlap; callers serialize them.
pub struct IngestionPipeline {
    registry: Arc<dyn FeedRegistry>,
    aggregator: Aggregator,
    post_processor: PostProcessor,
    cache: ArticleCache,
}

impl IngestionPipeline {
    pub fn new(
        config: PipelineConfig,
        documents: Arc<dyn DocumentParser>,
        registry: Arc<dyn FeedRegistry>,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self> {
        let post_processor = PostProcessor::from_config(&config);
        let aggregator = Aggregator::new(config, documents)?;

        Ok(Self {
            registry,
            aggregator,
            post_processor,
            cache: ArticleCache::new(store),
        })
    }

    pub fn cache(&self) -> &ArticleCache {
        &self.cache
    }

    pub async fn run_once(&self) -> Result<RunReport> {
        let feeds = self.registry.list_feeds().await?;
        info!("Starting ingestion run over {} feeds", feeds.len());

        let outcome = self.aggregator.run_with_report(&feeds).await?;
        let articles_collected = outcome.articles.len();

        let articles = self.post_processor.process(outcome.articles);
        self.cache.publish(&articles).await?;

        let report = RunReport {
            run_id: outcome.run_id,
            feeds_attempted: outcome.feeds_attempted,
            feeds_succeeded: outcome.feeds_succeeded,
            failures: outcome.failures,
            articles_collected,
            articles_published: articles.len(),
            images_scraped: outcome.scraped,
        };
        info!(
            "Run {} finished: {}/{} feeds, {} collected, {} published",
            report.run_id,
            report.feeds_succeeded,
            report.feeds_attempted,
            report.articles_collected,
            report.articles_published
        );
        Ok(report)
    }
}
