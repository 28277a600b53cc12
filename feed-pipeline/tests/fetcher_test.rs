//! Fetcher behaviour against local `wiremock` servers: direct success,
//! proxy failover, and each attempt error classification.

use feed_pipeline::{Expect, FetchConfig, Fetcher};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_BODY: &str = r#"<?xml version="1.0"?><rss><channel></channel></rss>"#;

fn direct_config() -> FetchConfig {
    FetchConfig {
        user_agent: "feed-pipeline-test/0.1".to_string(),
        feed_timeout: Duration::from_millis(300),
        scrape_timeout: Duration::from_millis(300),
        ..FetchConfig::direct_only()
    }
}

#[tokio::test]
async fn direct_fetch_succeeds_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(direct_config()).unwrap();
    let result = fetcher.fetch_feed(&format!("{}/feed.xml", server.uri())).await;

    assert!(result.success, "errors: {}", result.error_summary());
    assert_eq!(result.body.as_deref(), Some(FEED_BODY));
    assert_eq!(result.http_status, Some(200));
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(result.attempts[0].via, "direct");
    assert!(result.attempt_errors().is_empty());
}

#[tokio::test]
async fn falls_back_to_proxy_after_direct_failure() {
    let origin = MockServer::start().await;
    let proxy = MockServer::start().await;
    let target = format!("{}/feed.xml", origin.uri());

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .and(query_param("url", target.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .expect(1)
        .mount(&proxy)
        .await;

    let config = FetchConfig {
        proxies: vec![format!("{}/raw?url={{url}}", proxy.uri())],
        ..direct_config()
    };
    let fetcher = Fetcher::new(config).unwrap();
    let result = fetcher.fetch_feed(&target).await;

    assert!(result.success, "errors: {}", result.error_summary());
    assert_eq!(result.attempts.len(), 2);
    assert_eq!(result.attempts[1].via, "127.0.0.1");
    assert_eq!(result.attempt_errors(), vec!["status 503".to_string()]);
}

#[tokio::test]
async fn proxy_only_mode_skips_direct_attempt() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .mount(&proxy)
        .await;

    let config = FetchConfig {
        direct: false,
        proxies: vec![format!("{}/raw?url={{url}}", proxy.uri())],
        ..direct_config()
    };
    let fetcher = Fetcher::new(config).unwrap();
    let result = fetcher.fetch_feed("https://unreachable.invalid/feed.xml").await;

    assert!(result.success);
    assert_eq!(result.attempts.len(), 1);
    assert_ne!(result.attempts[0].via, "direct");
}

#[tokio::test]
async fn slow_responses_are_classified_as_timeouts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FEED_BODY)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(direct_config()).unwrap();
    let result = fetcher.fetch_feed(&format!("{}/slow.xml", server.uri())).await;

    assert!(!result.success);
    assert_eq!(result.attempt_errors(), vec!["timeout".to_string()]);
}

#[tokio::test]
async fn non_markup_body_is_invalid_feed_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"error\": \"blocked\"}"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(direct_config()).unwrap();
    let url = format!("{}/feed.json", server.uri());

    let feed = fetcher.fetch_feed(&url).await;
    assert!(!feed.success);
    assert_eq!(feed.attempt_errors(), vec!["invalid content".to_string()]);

    // Pages only need to be non-empty
    let page = fetcher.fetch(&url, Expect::Page, Duration::from_millis(300)).await;
    assert!(page.success);
}

#[tokio::test]
async fn every_failed_attempt_is_reported_in_order() {
    let origin = MockServer::start().await;
    let proxy = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&proxy)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .mount(&proxy)
        .await;

    let config = FetchConfig {
        proxies: vec![
            format!("{}/first?u={{url}}", proxy.uri()),
            format!("{}/second?u={{url}}", proxy.uri()),
        ],
        ..direct_config()
    };
    let fetcher = Fetcher::new(config).unwrap();
    let result = fetcher.fetch_feed(&format!("{}/feed.xml", origin.uri())).await;

    assert!(!result.success);
    assert_eq!(result.http_status, Some(500));
    assert_eq!(
        result.error_summary(),
        "status 403, status 500, invalid content"
    );
}

#[tokio::test]
async fn no_routes_configured_is_reported() {
    let config = FetchConfig {
        direct: false,
        proxies: Vec::new(),
        ..direct_config()
    };
    let fetcher = Fetcher::new(config).unwrap();
    let result = fetcher.fetch_feed("https://example.com/feed.xml").await;

    assert!(!result.success);
    assert_eq!(result.attempt_errors(), vec!["no fetch attempts configured".to_string()]);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let server = MockServer::start().await;
    let body = format!("<rss>{}</rss>", "x".repeat(2 * 1024 * 1024));
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_body_size_mb: 1,
        feed_timeout: Duration::from_secs(5),
        ..direct_config()
    };
    let fetcher = Fetcher::new(config).unwrap();
    let result = fetcher.fetch_feed(&format!("{}/big.xml", server.uri())).await;

    assert!(!result.success);
    assert_eq!(result.attempt_errors(), vec!["too large (2MB)".to_string()]);
}

#[tokio::test]
async fn huge_body_limit_does_not_overflow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_body_size_mb: usize::MAX,
        ..direct_config()
    };
    let fetcher = Fetcher::new(config).unwrap();
    let result = fetcher.fetch_feed(&format!("{}/feed.xml", server.uri())).await;

    assert!(result.success, "errors: {}", result.error_summary());
}
