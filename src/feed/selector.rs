//! Round-robin feed selection by staleness.

use super::repository::FeedRepository;
use super::types::Feed;
use crate::db::Database;
use crate::{GatorError, Result};

/// Picks the next feed to poll.
///
/// The feed with the oldest fetch attempt wins; never-fetched feeds beat any
/// fetched one, and ties go to the feed created first. Because the scheduler
/// marks a feed before fetching it, repeated calls cycle through every feed.
#[derive(Debug, Clone)]
pub struct FeedSelector {
    db: Database,
}

impl FeedSelector {
    /// Create a selector over the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return the stalest feed, or `NoFeeds` if there are none.
    pub async fn next(&self) -> Result<Feed> {
        FeedRepository::new(self.db.pool())
            .select_stalest()
            .await?
            .ok_or(GatorError::NoFeeds)
    }
}
