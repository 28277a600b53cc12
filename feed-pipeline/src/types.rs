use chrono::{DateTime, Utc};
use std::time::Duration;

pub use interfaces::defs::{Article, FeedConfig, Language, PriorityTier};

/// Proxy templates tried after the direct request. `{url}` is replaced by the
/// percent-encoded target.
pub const DEFAULT_PROXIES: &[&str] = &[
    "https://api.allorigins.win/raw?url={url}",
    "https://corsproxy.io/?url={url}",
    "https://api.codetabs.com/v1/proxy?quest={url}",
];

/// At most this many feeds are named in an `AllSourcesFailed` message.
pub const MAX_DIAGNOSTIC_FEEDS: usize = 5;

/// Feed dialect, decided by the document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Rss,
    Atom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: Option<String>,
}

impl Enclosure {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|mime| mime.trim().to_ascii_lowercase().starts_with("image"))
            .unwrap_or(false)
    }
}

/// Image references embedded in a feed item, in the order the resolver consults them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageHints {
    pub enclosure: Option<Enclosure>,
    /// Plain-text `<thumbnail>` element.
    pub thumbnail: Option<String>,
    pub media_thumbnail: Option<String>,
    pub media_content: Option<String>,
    /// First non-tracking `<img src>` in the content or description markup.
    pub inline_image: Option<String>,
}

/// One feed item as extracted by the parser. Never leaves its feed's unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published_at_raw: String,
    pub published_at: DateTime<Utc>,
    pub guid: Option<String>,
    pub description_html: Option<String>,
    pub content_html: Option<String>,
    pub images: ImageHints,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Try the target directly before any proxy.
    pub direct: bool,
    pub proxies: Vec<String>,
    pub feed_timeout: Duration,
    pub scrape_timeout: Duration,
    pub max_body_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; FeedPipeline/1.0)".to_string(),
            direct: true,
            proxies: DEFAULT_PROXIES.iter().map(|p| p.to_string()).collect(),
            feed_timeout: Duration::from_secs(8),
            scrape_timeout: Duration::from_secs(10),
            max_body_size_mb: 10,
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Timeouts used when a request handler waits on the run.
    pub fn interactive() -> Self {
        Self {
            scrape_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    pub fn direct_only() -> Self {
        Self {
            proxies: Vec::new(),
            ..Self::default()
        }
    }
}

/// What a successful body must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Markup: trimmed body starts with `<`.
    Feed,
    /// Any non-empty body.
    Page,
}

impl Expect {
    pub fn accepts(&self, body: &str) -> bool {
        let trimmed = body.trim_start_matches('\u{feff}').trim_start();
        match self {
            Expect::Feed => trimmed.starts_with('<'),
            Expect::Page => !trimmed.is_empty(),
        }
    }
}

/// Why a single fetch attempt failed. Recorded, never raised on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchAttemptError {
    #[error("timeout")]
    Timeout,

    #[error("status {0}")]
    HttpStatus(u16),

    #[error("invalid content")]
    InvalidContent,

    #[error("too large ({size_mb}MB)")]
    TooLarge { size_mb: usize },

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for FetchAttemptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchAttemptError::Timeout
        } else {
            FetchAttemptError::Unknown(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// "direct" or the proxy host.
    pub via: String,
    pub error: Option<FetchAttemptError>,
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub success: bool,
    pub body: Option<String>,
    pub http_status: Option<u16>,
    pub attempts: Vec<FetchAttempt>,
    pub response_time_ms: u64,
}

impl FetchResult {
    pub fn attempt_errors(&self) -> Vec<String> {
        if self.attempts.is_empty() && !self.success {
            return vec!["no fetch attempts configured".to_string()];
        }
        self.attempts
            .iter()
            .filter_map(|attempt| attempt.error.as_ref().map(|e| e.to_string()))
            .collect()
    }

    pub fn error_summary(&self) -> String {
        self.attempt_errors().join(", ")
    }
}

/// Per-feed failure kept for the total-failure diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub feed_name: String,
    pub attempt_errors: Vec<String>,
}

impl FeedFailure {
    pub fn describe(&self) -> String {
        format!("{} ({})", self.feed_name, self.attempt_errors.join(", "))
    }
}

/// "FeedA (status 403, timeout); FeedB (status 500)" with a trailing `...`
/// once more than [`MAX_DIAGNOSTIC_FEEDS`] feeds failed.
pub fn summarize_failures(failures: &[FeedFailure]) -> String {
    let mut summary = failures
        .iter()
        .take(MAX_DIAGNOSTIC_FEEDS)
        .map(FeedFailure::describe)
        .collect::<Vec<_>>()
        .join("; ");
    if failures.len() > MAX_DIAGNOSTIC_FEEDS {
        summary.push_str("...");
    }
    summary
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] anyhow::Error),

    #[error("Invalid configuration {var}: {reason}")]
    Config { var: String, reason: String },

    #[error("Could not fetch from any source. Diagnostics: {diagnostics}")]
    AllSourcesFailed { diagnostics: String },
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
