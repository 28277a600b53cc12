use feed_pipeline::{AggregatorError, DedupScope, PipelineConfig, PostProcessor};
use std::collections::HashMap;
use std::env::VarError;
use std::time::Duration;

fn config_from(vars: &[(&str, &str)]) -> Result<PipelineConfig, AggregatorError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    PipelineConfig::from_lookup(|key| vars.get(key).cloned().ok_or(VarError::NotPresent))
}

fn rejected_var(result: Result<PipelineConfig, AggregatorError>) -> String {
    match result {
        Err(AggregatorError::Config { var, .. }) => var,
        other => panic!("expected a config error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn empty_environment_yields_defaults() {
    let config = config_from(&[]).unwrap();

    assert!(config.fetch.direct);
    assert!(!config.fetch.proxies.is_empty());
    assert!(config.fetch.proxies.iter().all(|p| p.contains("{url}")));
    assert_eq!(config.max_concurrent_feeds, 8);
    assert_eq!(config.scrape_batch_size, 10);
    assert_eq!(config.scrape_batch_pause, Duration::from_millis(500));
    assert!(!config.scrape_placeholders);
    assert_eq!(config.recency_window, chrono::Duration::hours(168));
    assert_eq!(config.summary_max_chars, 150);
    assert_eq!(config.dedup_scope, DedupScope::PerSource);
}

#[test]
fn overrides_are_applied() {
    let config = config_from(&[
        ("FEED_PIPELINE_USER_AGENT", "custom-agent/2.0"),
        ("FEED_PIPELINE_DIRECT", "off"),
        ("FEED_PIPELINE_PROXIES", "https://p1.example/?u={url}, https://p2.example/get?url={url}"),
        ("FEED_PIPELINE_FEED_TIMEOUT_MS", "2500"),
        ("FEED_PIPELINE_DEDUP_SCOPE", "global"),
        ("FEED_PIPELINE_RECENCY_HOURS", "48"),
        ("FEED_PIPELINE_SCRAPE_PLACEHOLDERS", "YES"),
        ("FEED_PIPELINE_SCRAPE_PAUSE_MS", "0"),
    ])
    .unwrap();

    assert_eq!(config.fetch.user_agent, "custom-agent/2.0");
    assert!(!config.fetch.direct);
    assert_eq!(
        config.fetch.proxies,
        vec![
            "https://p1.example/?u={url}".to_string(),
            "https://p2.example/get?url={url}".to_string()
        ]
    );
    assert_eq!(config.fetch.feed_timeout, Duration::from_millis(2500));
    assert_eq!(config.dedup_scope, DedupScope::Global);
    assert_eq!(config.recency_window, chrono::Duration::hours(48));
    assert!(config.scrape_placeholders);
    assert_eq!(config.scrape_batch_pause, Duration::ZERO);
}

#[test]
fn invalid_values_name_the_offending_variable() {
    assert_eq!(
        rejected_var(config_from(&[("FEED_PIPELINE_FEED_TIMEOUT_MS", "soon")])),
        "FEED_PIPELINE_FEED_TIMEOUT_MS"
    );
    assert_eq!(
        rejected_var(config_from(&[("FEED_PIPELINE_MAX_CONCURRENT_FEEDS", "0")])),
        "FEED_PIPELINE_MAX_CONCURRENT_FEEDS"
    );
    assert_eq!(
        rejected_var(config_from(&[("FEED_PIPELINE_DIRECT", "maybe")])),
        "FEED_PIPELINE_DIRECT"
    );
    assert_eq!(
        rejected_var(config_from(&[("FEED_PIPELINE_DEDUP_SCOPE", "everything")])),
        "FEED_PIPELINE_DEDUP_SCOPE"
    );
}

#[test]
fn proxy_templates_need_a_url_marker() {
    let err = config_from(&[("FEED_PIPELINE_PROXIES", "https://proxy.example/fetch")]).unwrap_err();
    assert!(err.to_string().contains("FEED_PIPELINE_PROXIES"));
    assert!(err.to_string().contains("{url}"));
}

#[test]
fn some_route_must_remain() {
    assert_eq!(
        rejected_var(config_from(&[
            ("FEED_PIPELINE_DIRECT", "false"),
            ("FEED_PIPELINE_PROXIES", ""),
        ])),
        "FEED_PIPELINE_DIRECT"
    );

    let proxies_only = config_from(&[("FEED_PIPELINE_DIRECT", "0")]).unwrap();
    assert!(!proxies_only.fetch.direct);
}

#[test]
fn recency_window_must_stay_representable() {
    assert_eq!(
        rejected_var(config_from(&[("FEED_PIPELINE_RECENCY_HOURS", "100000000000")])),
        "FEED_PIPELINE_RECENCY_HOURS"
    );
    assert_eq!(
        rejected_var(config_from(&[("FEED_PIPELINE_RECENCY_HOURS", "18446744073709551615")])),
        "FEED_PIPELINE_RECENCY_HOURS"
    );

    let year = config_from(&[("FEED_PIPELINE_RECENCY_HOURS", "8760")]).unwrap();
    assert_eq!(year.recency_window, chrono::Duration::hours(8760));
    assert!(PostProcessor::from_config(&year).process(Vec::new()).is_empty());
}

#[test]
fn body_size_limit_is_bounded() {
    assert_eq!(
        rejected_var(config_from(&[("FEED_PIPELINE_MAX_BODY_MB", "18446744073709551615")])),
        "FEED_PIPELINE_MAX_BODY_MB"
    );
    let config = config_from(&[("FEED_PIPELINE_MAX_BODY_MB", "50")]).unwrap();
    assert_eq!(config.fetch.max_body_size_mb, 50);
}
