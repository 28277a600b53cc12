//! Full ingestion runs: registry snapshot, aggregation, post-processing and
//! cache publication over an in-memory store.

use chrono::{Duration as ChronoDuration, Utc};
use feed_pipeline::document::DomDocumentParser;
use feed_pipeline::state::{ARTICLES_KEY, MEDIUM_KEY, PREVIEW_KEY, PREVIEW_LEN};
use feed_pipeline::{AggregatorError, FeedConfig, FetchConfig, IngestionPipeline, PipelineConfig};
use interfaces::{CacheStore, MemoryCache, StaticFeedRegistry};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> PipelineConfig {
    let fetch = FetchConfig {
        feed_timeout: Duration::from_millis(500),
        ..FetchConfig::direct_only()
    };
    PipelineConfig::default().with_fetch(fetch)
}

fn rss_with_items(count: usize) -> String {
    let items: String = (0..count)
        .map(|n| {
            format!(
                "<item><title>Story {n}</title><link>https://news.example.com/{n}</link>\
                 <pubDate>{}</pubDate><enclosure url=\"https://img.example.com/{n}.jpg\" type=\"image/jpeg\"/></item>",
                (Utc::now() - ChronoDuration::hours(n as i64 + 1)).to_rfc2822()
            )
        })
        .collect();
    format!("<rss version=\"2.0\"><channel><title>News</title>{}</channel></rss>", items)
}

#[tokio::test]
async fn run_once_publishes_staged_slices() {
    let server = MockServer::start().await;
    let mut body = rss_with_items(20);
    // A stale duplicate and an out-of-window story
    body = body.replace(
        "</channel>",
        &format!(
            "<item><title>STORY 0</title><link>https://news.example.com/dup</link><pubDate>{}</pubDate></item>\
             <item><title>Ancient</title><link>https://news.example.com/old</link><pubDate>{}</pubDate></item></channel>",
            (Utc::now() - ChronoDuration::hours(2)).to_rfc2822(),
            (Utc::now() - ChronoDuration::days(30)).to_rfc2822()
        ),
    );
    Mock::given(method("GET"))
        .and(path("/news.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let registry = Arc::new(StaticFeedRegistry::new(vec![FeedConfig::new(
        "news",
        format!("{}/news.xml", server.uri()),
        "News",
    )]));
    let store = Arc::new(MemoryCache::new());
    let pipeline = IngestionPipeline::new(
        test_config(),
        Arc::new(DomDocumentParser::new()),
        registry,
        store.clone(),
    )
    .unwrap();

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.feeds_attempted, 1);
    assert_eq!(report.feeds_succeeded, 1);
    assert!(report.failures.is_empty());
    assert_eq!(report.articles_collected, 22);
    assert_eq!(report.articles_published, 20);

    let cache = pipeline.cache();
    let articles = cache.load(ARTICLES_KEY).await.unwrap();
    assert_eq!(articles.len(), 20);
    assert_eq!(articles[0].title, "Story 0");
    assert_eq!(articles[0].image_url, "https://img.example.com/0.jpg");
    assert!(articles
        .windows(2)
        .all(|pair| pair[0].publication_date >= pair[1].publication_date));

    let preview = cache.load(PREVIEW_KEY).await.unwrap();
    assert_eq!(preview.len(), PREVIEW_LEN);
    assert_eq!(preview[..], articles[..PREVIEW_LEN]);
    assert_eq!(cache.load(MEDIUM_KEY).await.unwrap().len(), 20);

    assert!(cache.updated_at().await.unwrap().is_some());
    assert!(store.get(ARTICLES_KEY).await.unwrap().unwrap().contains("\"publicationDate\""));
}

#[tokio::test]
async fn failed_run_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let registry = Arc::new(StaticFeedRegistry::new(vec![FeedConfig::new(
        "down",
        format!("{}/down.xml", server.uri()),
        "Down",
    )]));
    let store = Arc::new(MemoryCache::new());
    let pipeline = IngestionPipeline::new(
        test_config(),
        Arc::new(DomDocumentParser::new()),
        registry,
        store.clone(),
    )
    .unwrap();

    let err = pipeline.run_once().await.unwrap_err();
    assert!(matches!(err, AggregatorError::AllSourcesFailed { .. }));
    assert!(store.is_empty().await);
    assert!(pipeline.cache().load(ARTICLES_KEY).await.unwrap().is_empty());
    assert_eq!(pipeline.cache().updated_at().await.unwrap(), None);
}

#[tokio::test]
async fn empty_registry_publishes_an_empty_list() {
    let store = Arc::new(MemoryCache::new());
    let pipeline = IngestionPipeline::new(
        test_config(),
        Arc::new(DomDocumentParser::new()),
        Arc::new(StaticFeedRegistry::default()),
        store.clone(),
    )
    .unwrap();

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.articles_published, 0);
    assert_eq!(store.get(ARTICLES_KEY).await.unwrap().as_deref(), Some("[]"));
}
