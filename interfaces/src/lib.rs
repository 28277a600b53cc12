//! Contracts shared between the ingestion pipeline and its collaborators:
//! the feed registry it reads from and the cache it publishes into.

pub mod defs;
pub mod registry;
pub mod state;

pub use defs::{Article, FeedConfig, FeedRegistry, Language, PriorityTier};
pub use registry::StaticFeedRegistry;
pub use state::{CacheStore, MemoryCache};
