use crate::config::PipelineConfig;
use crate::document::DocumentParser;
use crate::fetcher::Fetcher;
use crate::image_resolver::ImageResolver;
use crate::og_scraper::{OgImageScraper, ScrapePolicy};
use crate::parser::FeedParser;
use crate::types::{summarize_failures, AggregatorError, Article, FeedConfig, FeedFailure, RawItem, Result};
use crate::utils::text::strip_html_and_truncate;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything one aggregation run produced, before post-processing.
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    pub run_id: Uuid,
    pub articles: Vec<Article>,
    pub failures: Vec<FeedFailure>,
    pub feeds_attempted: usize,
    pub feeds_succeeded: usize,
    pub scraped: usize,
}

pub struct Aggregator {
    config: PipelineConfig,
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
    resolver: ImageResolver,
    scraper: OgImageScraper,
}

impl Aggregator {
    pub fn new(config: PipelineConfig, documents: Arc<dyn DocumentParser>) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
        let parser = FeedParser::new(documents.clone());
        let scraper = OgImageScraper::new(fetcher.clone(), documents);

        Ok(Self {
            config,
            fetcher,
            parser,
            resolver: ImageResolver::new(),
            scraper,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Articles from every feed that could be fetched and parsed. Fails only
    /// when feeds were given and none of them succeeded.
    pub async fn run(&self, feeds: &[FeedConfig]) -> Result<Vec<Article>> {
        Ok(self.run_with_report(feeds).await?.articles)
    }

    pub async fn run_with_report(&self, feeds: &[FeedConfig]) -> Result<AggregationOutcome> {
        let run_id = Uuid::new_v4();
        info!("Run {}: aggregating {} feeds", run_id, feeds.len());

        // Each unit owns its own slot; results are merged in feed order afterwards.
        let outcomes: Vec<std::result::Result<Vec<Article>, FeedFailure>> = stream::iter(feeds)
            .map(|feed| self.process_feed(feed))
            .buffered(self.config.max_concurrent_feeds.max(1))
            .collect()
            .await;

        let mut outcome = AggregationOutcome {
            run_id,
            feeds_attempted: feeds.len(),
            ..Default::default()
        };
        for result in outcomes {
            match result {
                Ok(articles) => {
                    outcome.feeds_succeeded += 1;
                    outcome.articles.extend(articles);
                }
                Err(failure) => outcome.failures.push(failure),
            }
        }

        if outcome.feeds_succeeded == 0 && !feeds.is_empty() {
            let diagnostics = summarize_failures(&outcome.failures);
            error!("Run {}: all {} feeds failed", run_id, feeds.len());
            return Err(AggregatorError::AllSourcesFailed { diagnostics });
        }

        for failure in &outcome.failures {
            warn!("Run {}: feed failed: {}", run_id, failure.describe());
        }

        let policy = ScrapePolicy {
            batch_size: self.config.scrape_batch_size,
            batch_pause: self.config.scrape_batch_pause,
            include_placeholders: self.config.scrape_placeholders,
        };
        outcome.scraped = self.scraper.scrape_pass(&mut outcome.articles, &policy).await;

        info!(
            "Run {}: {}/{} feeds succeeded, {} articles, {} scraped images",
            run_id,
            outcome.feeds_succeeded,
            outcome.feeds_attempted,
            outcome.articles.len(),
            outcome.scraped
        );
        Ok(outcome)
    }

    /// Fetch, parse and resolve one feed.
    async fn process_feed(&self, feed: &FeedConfig) -> std::result::Result<Vec<Article>, FeedFailure> {
        let fetch_result = self.fetcher.fetch_feed(&feed.url).await;

        let content = match fetch_result.body {
            Some(content) if fetch_result.success => content,
            _ => {
                return Err(FeedFailure {
                    feed_name: feed.display_name.clone(),
                    attempt_errors: fetch_result.attempt_errors(),
                });
            }
        };

        let items = self.parser.parse_feed(&content).map_err(|e| {
            warn!("Failed to parse {}: {}", feed.display_name, e);
            FeedFailure {
                feed_name: feed.display_name.clone(),
                attempt_errors: vec![e.to_string()],
            }
        })?;

        let articles: Vec<Article> = items
            .into_iter()
            .map(|item| self.to_article(item, feed))
            .collect();

        debug!("Feed {}: {} articles", feed.display_name, articles.len());
        Ok(articles)
    }

    fn to_article(&self, item: RawItem, feed: &FeedConfig) -> Article {
        let image = self.resolver.resolve(&item, feed);
        let summary = item
            .description_html
            .as_deref()
            .or(item.content_html.as_deref())
            .map(|html| strip_html_and_truncate(html, self.config.summary_max_chars))
            .unwrap_or_default();

        Article {
            id: item.guid.unwrap_or_else(|| item.link.clone()),
            title: item.title,
            source: feed.display_name.clone(),
            publication_date: item.published_at,
            summary,
            link: item.link,
            image_url: image.image_url,
            needs_scraping: image.needs_scraping,
            language: feed.language,
        }
    }
}
