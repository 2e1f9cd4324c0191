//! Feed aggregation for gator.
//!
//! Feeds, follows and posts, plus the fetch pipeline that keeps posts
//! current: selector → parser → ingester, driven by the scheduler.

pub mod fetcher;
pub mod ingester;
pub mod repository;
pub mod scheduler;
pub mod selector;
pub mod types;

pub use fetcher::{parse_feed, validate_url, FeedParser, HttpFeedParser};
pub use ingester::{parse_published_at, IngestOutcome, IngestSummary, PostIngester, SkipReason};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{FetchScheduler, TickOutcome};
pub use selector::FeedSelector;
pub use types::{
    Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewFeed, NewPost, Post, RawFeed, RawItem,
    MAX_DESCRIPTION_LENGTH,
};
