pub mod types;
pub mod config;
pub mod document;
pub mod utils;
pub mod rss_utils;
pub mod fetcher;
pub mod parser;
pub mod rewrites;
pub mod image_resolver;
pub mod og_scraper;
pub mod aggregator;
pub mod processing;
pub mod feed_manager;
pub mod state;
pub mod pipeline;

pub use types::*;
pub use config::PipelineConfig;
pub use document::{DocumentParser, DomDocumentParser, RegexDocumentParser};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use image_resolver::{ImageResolution, ImageResolver};
pub use og_scraper::{OgImageScraper, ScrapePolicy};
pub use aggregator::{AggregationOutcome, Aggregator};
pub use processing::{DedupScope, PostProcessor, ProcessingStage};
pub use feed_manager::{FeedManager, JsonFileRegistry, PgFeedRegistry};
pub use state::{ArticleCache, PgCacheStore};
pub use pipeline::{IngestionPipeline, RunReport};
