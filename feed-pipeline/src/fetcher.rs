use crate::rss_utils::url::{encode_component, host};
use crate::types::{Expect, FetchAttempt, FetchAttemptError, FetchConfig, FetchResult, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Retrieving fetcher: one direct attempt (when allowed) followed by the
/// configured proxies, stopping at the first body that looks right.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        // Deadlines are applied per attempt, not on the client.
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn fetch_feed(&self, url: &str) -> FetchResult {
        self.fetch(url, Expect::Feed, self.config.feed_timeout).await
    }

    pub async fn fetch_page(&self, url: &str) -> FetchResult {
        self.fetch(url, Expect::Page, self.config.scrape_timeout).await
    }

    /// Never fails: every problem is recorded as an attempt error on the
    /// returned result.
    pub async fn fetch(&self, url: &str, expect: Expect, timeout: Duration) -> FetchResult {
        let start_time = Instant::now();
        let mut attempts = Vec::new();
        let mut last_status = None;

        debug!("Fetching {} ({} route(s))", url, self.routes(url).len());

        for (via, target) in self.routes(url) {
            match self.attempt(&target, expect, timeout).await {
                Ok((status, body)) => {
                    let response_time_ms = start_time.elapsed().as_millis() as u64;
                    info!("Fetched {} via {} ({} bytes, {}ms)", url, via, body.len(), response_time_ms);
                    attempts.push(FetchAttempt { via, error: None });
                    return FetchResult {
                        url: url.to_string(),
                        success: true,
                        body: Some(body),
                        http_status: Some(status),
                        attempts,
                        response_time_ms,
                    };
                }
                Err(error) => {
                    debug!("Attempt via {} failed for {}: {}", via, url, error);
                    if let FetchAttemptError::HttpStatus(code) = &error {
                        last_status = Some(*code);
                    }
                    attempts.push(FetchAttempt { via, error: Some(error) });
                }
            }
        }

        let result = FetchResult {
            url: url.to_string(),
            success: false,
            body: None,
            http_status: last_status,
            attempts,
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };
        warn!("All attempts failed for {}: {}", url, result.error_summary());
        result
    }

    /// `(via, request url)` pairs in the order they are tried.
    fn routes(&self, url: &str) -> Vec<(String, String)> {
        let mut routes = Vec::with_capacity(self.config.proxies.len() + 1);
        if self.config.direct {
            routes.push(("direct".to_string(), url.to_string()));
        }
        for template in &self.config.proxies {
            let target = template.replace("{url}", &encode_component(url));
            let via = host(&target).unwrap_or_else(|| template.clone());
            routes.push((via, target));
        }
        routes
    }

    async fn attempt(
        &self,
        target: &str,
        expect: Expect,
        timeout: Duration,
    ) -> std::result::Result<(u16, String), FetchAttemptError> {
        match tokio::time::timeout(timeout, self.request(target, expect)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchAttemptError::Timeout),
        }
    }

    async fn request(&self, target: &str, expect: Expect) -> std::result::Result<(u16, String), FetchAttemptError> {
        let response = self.client.get(target).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchAttemptError::HttpStatus(status.as_u16()));
        }

        // Check content length
        let limit = self.config.max_body_size_mb.saturating_mul(1024 * 1024);
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit {
                return Err(FetchAttemptError::TooLarge {
                    size_mb: content_length as usize / (1024 * 1024),
                });
            }
        }

        let body = response.text().await?;
        if body.len() > limit {
            return Err(FetchAttemptError::TooLarge {
                size_mb: body.len() / (1024 * 1024),
            });
        }
        if !expect.accepts(&body) {
            return Err(FetchAttemptError::InvalidContent);
        }

        Ok((status.as_u16(), body))
    }
}
