use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use feed_pipeline::document::{DocumentParser, DomDocumentParser, RegexDocumentParser};
use feed_pipeline::state::ARTICLES_KEY;
use feed_pipeline::{
    AggregatorError, FeedManager, FetchConfig, IngestionPipeline, JsonFileRegistry, PgCacheStore,
    PipelineConfig,
};
use interfaces::{CacheStore, FeedRegistry, MemoryCache};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CacheTarget {
    /// Upsert into the cache_entries table
    Postgres,
    /// Print the published article list as JSON
    Stdout,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ParserKind {
    Dom,
    Regex,
}

#[derive(Parser)]
#[clap(name = "feed-pipeline", about = "Fetch, normalize and cache articles from configured feeds")]
struct Cli {
    /// JSON file with the feed list (takes precedence over the database)
    #[clap(long)]
    feeds: Option<PathBuf>,

    #[clap(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[clap(long, value_enum, default_value = "stdout")]
    cache: CacheTarget,

    /// Only go through the proxy list
    #[clap(long)]
    no_direct: bool,

    /// Use the shorter scrape timeout of the request-handler path
    #[clap(long)]
    interactive: bool,

    #[clap(long, value_enum, default_value = "dom")]
    parser: ParserKind,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env()?;
    if cli.interactive {
        config.fetch.scrape_timeout = FetchConfig::interactive().scrape_timeout;
    }
    if cli.no_direct {
        if config.fetch.proxies.is_empty() {
            bail!("--no-direct needs at least one proxy template");
        }
        config.fetch.direct = false;
    }

    let documents: Arc<dyn DocumentParser> = match cli.parser {
        ParserKind::Dom => Arc::new(DomDocumentParser::new()),
        ParserKind::Regex => Arc::new(RegexDocumentParser::new()),
    };

    let registry: Arc<dyn FeedRegistry> = match (&cli.feeds, &cli.database_url) {
        (Some(path), _) => Arc::new(JsonFileRegistry::new(path.clone())),
        (None, Some(database_url)) => Arc::new(
            FeedManager::new(database_url)
                .await
                .context("connecting to the feed registry database")?,
        ),
        (None, None) => bail!("either --feeds or --database-url is required"),
    };

    let store: Arc<dyn CacheStore> = match cli.cache {
        CacheTarget::Postgres => {
            let database_url = cli
                .database_url
                .as_deref()
                .context("--cache postgres needs --database-url")?;
            let store = PgCacheStore::connect(database_url).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        CacheTarget::Stdout => Arc::new(MemoryCache::new()),
    };

    let pipeline = IngestionPipeline::new(config, documents, registry, store.clone())?;

    let report = match pipeline.run_once().await {
        Ok(report) => report,
        Err(AggregatorError::AllSourcesFailed { diagnostics }) => {
            error!("Could not fetch from any source: {}", diagnostics);
            bail!("Could not fetch from any source. Diagnostics: {}", diagnostics);
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        "Published {} articles ({} feeds ok, {} failed, {} images scraped)",
        report.articles_published,
        report.feeds_succeeded,
        report.failures.len(),
        report.images_scraped
    );

    if let CacheTarget::Stdout = cli.cache {
        let articles = store.get(ARTICLES_KEY).await?.unwrap_or_else(|| "[]".to_string());
        println!("{}", articles);
    }

    Ok(())
}
