use crate::processing::DedupScope;
use crate::types::{AggregatorError, FetchConfig, Result};
use std::time::Duration;

/// Ten years.
const MAX_RECENCY_HOURS: i64 = 24 * 366 * 10;

const MAX_BODY_SIZE_MB: usize = 1024;

/// Run-wide knobs for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub max_concurrent_feeds: usize,
    pub scrape_batch_size: usize,
    pub scrape_batch_pause: Duration,
    /// Also scrape articles whose image is the generated placeholder. Off by
    /// default; only feeds flagged `requires_scrape_fallback` are scraped.
    pub scrape_placeholders: bool,
    pub recency_window: chrono::Duration,
    pub summary_max_chars: usize,
    pub dedup_scope: DedupScope,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            max_concurrent_feeds: 8,
            scrape_batch_size: 10,
            scrape_batch_pause: Duration::from_millis(500),
            scrape_placeholders: false,
            recency_window: chrono::Duration::hours(168),
            summary_max_chars: 150,
            dedup_scope: DedupScope::default(),
        }
    }
}

impl PipelineConfig {
    /// Build from `FEED_PIPELINE_*` variables in the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Same as [`PipelineConfig::from_env`] over an arbitrary lookup, so
    /// parsing can be exercised without touching the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let defaults = Self::default();

        let invalid = |var: &str, reason: String| AggregatorError::Config {
            var: var.to_string(),
            reason,
        };

        let parse_u64 = |var: &str, default: u64| -> Result<u64> {
            match lookup(var) {
                Ok(raw) => raw.trim().parse::<u64>().map_err(|e| invalid(var, e.to_string())),
                Err(_) => Ok(default),
            }
        };

        let parse_count = |var: &str, default: usize| -> Result<usize> {
            let value = match lookup(var) {
                Ok(raw) => raw.trim().parse::<usize>().map_err(|e| invalid(var, e.to_string()))?,
                Err(_) => default,
            };
            if value == 0 {
                return Err(invalid(var, "must be at least 1".to_string()));
            }
            Ok(value)
        };

        let parse_bool = |var: &str, default: bool| -> Result<bool> {
            match lookup(var) {
                Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    other => Err(invalid(var, format!("expected a boolean, got '{}'", other))),
                },
                Err(_) => Ok(default),
            }
        };

        let mut fetch = defaults.fetch.clone();
        if let Ok(user_agent) = lookup("FEED_PIPELINE_USER_AGENT") {
            fetch.user_agent = user_agent;
        }
        fetch.direct = parse_bool("FEED_PIPELINE_DIRECT", fetch.direct)?;
        if let Ok(proxies) = lookup("FEED_PIPELINE_PROXIES") {
            // Comma separated; an empty value disables proxies entirely.
            fetch.proxies = proxies
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if let Some(bad) = fetch.proxies.iter().find(|p| !p.contains("{url}")) {
                return Err(invalid(
                    "FEED_PIPELINE_PROXIES",
                    format!("template '{}' has no {{url}} marker", bad),
                ));
            }
        }
        fetch.feed_timeout = Duration::from_millis(parse_u64(
            "FEED_PIPELINE_FEED_TIMEOUT_MS",
            fetch.feed_timeout.as_millis() as u64,
        )?);
        fetch.scrape_timeout = Duration::from_millis(parse_u64(
            "FEED_PIPELINE_SCRAPE_TIMEOUT_MS",
            fetch.scrape_timeout.as_millis() as u64,
        )?);
        fetch.max_body_size_mb = parse_count("FEED_PIPELINE_MAX_BODY_MB", fetch.max_body_size_mb)?;

        if !fetch.direct && fetch.proxies.is_empty() {
            return Err(invalid(
                "FEED_PIPELINE_DIRECT",
                "direct fetching disabled and no proxies configured".to_string(),
            ));
        }

        let dedup_scope = match lookup("FEED_PIPELINE_DEDUP_SCOPE") {
            Ok(raw) => DedupScope::from_name(&raw).ok_or_else(|| {
                invalid(
                    "FEED_PIPELINE_DEDUP_SCOPE",
                    format!("expected 'per-source' or 'global', got '{}'", raw),
                )
            })?,
            Err(_) => defaults.dedup_scope,
        };

        let recency_hours = parse_u64(
            "FEED_PIPELINE_RECENCY_HOURS",
            defaults.recency_window.num_hours() as u64,
        )?;
        let recency_window = i64::try_from(recency_hours)
            .ok()
            .filter(|hours| *hours <= MAX_RECENCY_HOURS)
            .and_then(chrono::Duration::try_hours)
            .ok_or_else(|| {
                invalid(
                    "FEED_PIPELINE_RECENCY_HOURS",
                    format!("must be at most {} hours", MAX_RECENCY_HOURS),
                )
            })?;
        let max_body_size_mb = fetch.max_body_size_mb;
        if max_body_size_mb > MAX_BODY_SIZE_MB {
            return Err(invalid(
                "FEED_PIPELINE_MAX_BODY_MB",
                format!("must be at most {}", MAX_BODY_SIZE_MB),
            ));
        }

        Ok(Self {
            fetch,
            max_concurrent_feeds: parse_count(
                "FEED_PIPELINE_MAX_CONCURRENT_FEEDS",
                defaults.max_concurrent_feeds,
            )?,
            scrape_batch_size: parse_count("FEED_PIPELINE_SCRAPE_BATCH_SIZE", defaults.scrape_batch_size)?,
            scrape_batch_pause: Duration::from_millis(parse_u64(
                "FEED_PIPELINE_SCRAPE_PAUSE_MS",
                defaults.scrape_batch_pause.as_millis() as u64,
            )?),
            scrape_placeholders: parse_bool(
                "FEED_PIPELINE_SCRAPE_PLACEHOLDERS",
                defaults.scrape_placeholders,
            )?,
            recency_window,
            summary_max_chars: parse_count("FEED_PIPELINE_SUMMARY_CHARS", defaults.summary_max_chars)?,
            dedup_scope,
        })
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }
}
