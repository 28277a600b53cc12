use anyhow::Result;
use async_trait::async_trait;

use crate::defs::{FeedConfig, FeedRegistry};

/// Registry over a fixed in-memory list, returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticFeedRegistry {
    feeds: Vec<FeedConfig>,
}

impl StaticFeedRegistry {
    pub fn new(feeds: Vec<FeedConfig>) -> Self {
        Self { feeds }
    }

    pub fn push(&mut self, feed: FeedConfig) {
        self.feeds.push(feed);
    }
}

#[async_trait]
impl FeedRegistry for StaticFeedRegistry {
    async fn list_feeds(&self) -> Result<Vec<FeedConfig>> {
        Ok(self.feeds.clone())
    }
}
