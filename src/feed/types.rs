//! Feed, follow and post types for gator.

use chrono::{DateTime, Utc};

/// Maximum length for a post description.
pub const MAX_DESCRIPTION_LENGTH: usize = 10000;

/// A feed registered by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Display name given at `addfeed`.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// Owner user ID.
    pub user_id: i64,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last time a fetch was attempted. `None` until the first attempt.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owner user ID.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A feed together with its owner's name.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Name of the user who added it.
    pub owner_name: String,
}

/// A user's follow of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: i64,
    /// Following user.
    pub user_id: i64,
    /// Followed feed.
    pub feed_id: i64,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// Same as `created_at`; follows are never edited.
    pub updated_at: DateTime<Utc>,
}

/// A follow joined with the followed feed.
#[derive(Debug, Clone)]
pub struct FollowedFeed {
    /// Follow ID.
    pub follow_id: i64,
    /// Followed feed ID.
    pub feed_id: i64,
    /// Followed feed name.
    pub feed_name: String,
    /// Followed feed URL.
    pub feed_url: String,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Feed the post was first observed through.
    pub feed_id: i64,
    /// Post title.
    pub title: String,
    /// Canonical URL (unique across all feeds).
    pub url: String,
    /// Plain-text description.
    pub description: String,
    /// Publication time reported by the feed.
    pub published_at: DateTime<Utc>,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// Same as `created_at`; posts are immutable.
    pub updated_at: DateTime<Utc>,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Feed the item came from.
    pub feed_id: i64,
    /// Post title.
    pub title: String,
    /// Canonical URL.
    pub url: String,
    /// Plain-text description, possibly empty.
    pub description: String,
    /// Parsed publication time.
    pub published_at: DateTime<Utc>,
}

impl NewPost {
    /// Create a new post with an empty description.
    pub fn new(
        feed_id: i64,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feed_id,
            title: title.into(),
            url: url.into(),
            description: String::new(),
            published_at,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An entry as produced by a [`FeedParser`](super::FeedParser), before
/// validation.
///
/// `published_at` is date text in RFC 2822 or RFC 3339 form;
/// [`parse_feed`](super::parse_feed) always renders RFC 3339. Empty when the
/// entry carries no date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    /// Entry title.
    pub title: String,
    /// Entry link; empty if the feed gave none.
    pub link: String,
    /// Plain-text description; empty if absent.
    pub description: String,
    /// Date text as found or rendered; empty if absent.
    pub published_at: String,
}

impl RawItem {
    /// Create a raw item.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        published_at: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: String::new(),
            published_at: published_at.into(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A fetched and parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct RawFeed {
    /// Channel title.
    pub title: String,
    /// Entries in document order.
    pub items: Vec<RawItem>,
}
