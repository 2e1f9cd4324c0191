//! Feed, follow and post repositories for gator.

use chrono::{DateTime, Utc};

use super::types::{Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewFeed, NewPost, Post};
use crate::db::{format_timestamp, parse_timestamp, DbPool};
use crate::{GatorError, Result};

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at, f.last_fetched_at";

/// Row type for feed from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    name: String,
    url: String,
    user_id: i64,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_timestamp(&s)),
        }
    }
}

/// Row type for feed joined with its owner.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithOwnerRow {
    id: i64,
    name: String,
    url: String,
    user_id: i64,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
    owner_name: String,
}

impl From<FeedWithOwnerRow> for FeedWithOwner {
    fn from(row: FeedWithOwnerRow) -> Self {
        let feed = Feed {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_timestamp(&s)),
        };
        FeedWithOwner {
            feed,
            owner_name: row.owner_name,
        }
    }
}

/// Row type for feed follow from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowRow {
    id: i64,
    user_id: i64,
    feed_id: i64,
    created_at: String,
    updated_at: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: row.id,
            user_id: row.user_id,
            feed_id: row.feed_id,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct FollowedFeedRow {
    follow_id: i64,
    feed_id: i64,
    feed_name: String,
    feed_url: String,
}

impl From<FollowedFeedRow> for FollowedFeed {
    fn from(row: FollowedFeedRow) -> Self {
        FollowedFeed {
            follow_id: row.follow_id,
            feed_id: row.feed_id,
            feed_name: row.feed_name,
            feed_url: row.feed_url,
        }
    }
}

/// Row type for post from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    description: String,
    published_at: String,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: parse_timestamp(&row.published_at).unwrap_or_else(Utc::now),
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for feeds.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed. Fails with `Conflict` if the URL is already registered.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let now = format_timestamp(&Utc::now());
        let row = sqlx::query_as::<_, FeedRow>(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, url, user_id, created_at, updated_at, last_fetched_at
            "#,
        )
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match GatorError::from(e) {
            GatorError::Conflict(_) => {
                GatorError::Conflict(format!("feed {} already exists", feed.url))
            }
            other => other,
        })?;

        Ok(row.into())
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = ?");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = ?");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// List all feeds with their owners' names, in creation order.
    pub async fn list_all(&self) -> Result<Vec<FeedWithOwner>> {
        let query = format!(
            "SELECT {FEED_COLUMNS}, u.name AS owner_name
             FROM feeds f
             JOIN users u ON u.id = f.user_id
             ORDER BY f.id ASC"
        );
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(&query)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedWithOwner::from).collect())
    }

    /// Get the feed that has gone longest without a fetch attempt.
    ///
    /// Never-fetched feeds come first; ties go to the older feed.
    pub async fn select_stalest(&self) -> Result<Option<Feed>> {
        let query = format!(
            "SELECT {FEED_COLUMNS} FROM feeds f
             ORDER BY f.last_fetched_at IS NOT NULL, f.last_fetched_at ASC, f.id ASC
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Record a fetch attempt at `fetched_at`.
    ///
    /// Returns false if the feed no longer exists.
    pub async fn mark_fetched(&self, id: i64, fetched_at: DateTime<Utc>) -> Result<bool> {
        let ts = format_timestamp(&fetched_at);
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
                .bind(&ts)
                .bind(&ts)
                .bind(id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Repository for feed follows.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Follow a feed. Fails with `Conflict` if the user already follows it.
    pub async fn create(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let now = format_timestamp(&Utc::now());
        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, feed_id, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match GatorError::from(e) {
            GatorError::Conflict(_) => GatorError::Conflict("feed already followed".to_string()),
            other => other,
        })?;

        Ok(row.into())
    }

    /// Remove a user's follow of a feed. Returns false if there was none.
    pub async fn delete(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List the feeds a user follows, oldest follow first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<FollowedFeed>> {
        let rows = sqlx::query_as::<_, FollowedFeedRow>(
            r#"
            SELECT ff.id AS follow_id, f.id AS feed_id, f.name AS feed_name, f.url AS feed_url
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY ff.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FollowedFeed::from).collect())
    }

    /// Count follows of a (user, feed) pair.
    pub async fn count_pair(&self, user_id: i64, feed_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM feed_follows WHERE user_id = ? AND feed_id = ?",
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}

/// Repository for posts.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a post. Fails with `Conflict` if a post with the same URL exists
    /// under any feed.
    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        let now = format_timestamp(&Utc::now());
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, feed_id, title, url, description, published_at, created_at, updated_at
            "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(format_timestamp(&post.published_at))
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Most recent posts from the feeds a user follows, newest first.
    pub async fn list_recent_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                   p.created_at, p.updated_at
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Count all stored posts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
