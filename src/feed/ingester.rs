//! Idempotent post ingestion.
//!
//! Each raw item is validated and stored on its own. Post URLs are unique
//! across all feeds, so seeing the same entry again (from the same feed on a
//! later tick, or from another feed) is a skip, not an error.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::repository::PostRepository;
use super::types::{NewPost, Post, RawItem};
use crate::db::Database;
use crate::{GatorError, Result};

/// Why an item was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The publication date is missing or unparseable.
    BadDate,
    /// A post with the same URL already exists.
    Duplicate,
    /// The item has no link to use as its URL.
    MissingLink,
}

/// Result of ingesting one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The item was stored as a new post.
    Inserted(Post),
    /// The item was not stored.
    Skipped(SkipReason),
}

/// Counts for one ingested batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// New posts stored.
    pub inserted: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items rejected for a bad date or missing link.
    pub invalid: usize,
    /// Items that hit a store error.
    pub failed: usize,
}

impl IngestSummary {
    /// Number of items looked at.
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.invalid + self.failed
    }

    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Inserted(_) => self.inserted += 1,
            IngestOutcome::Skipped(SkipReason::Duplicate) => self.duplicates += 1,
            IngestOutcome::Skipped(SkipReason::BadDate | SkipReason::MissingLink) => {
                self.invalid += 1
            }
        }
    }
}

/// Validates raw items and stores them as posts.
#[derive(Debug, Clone)]
pub struct PostIngester {
    db: Database,
}

impl PostIngester {
    /// Create an ingester over the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ingest one item for `feed_id`.
    ///
    /// Store errors other than a duplicate URL are returned and not retried.
    pub async fn ingest(&self, feed_id: i64, item: &RawItem) -> Result<IngestOutcome> {
        let Some(published_at) = parse_published_at(&item.published_at) else {
            return Ok(IngestOutcome::Skipped(SkipReason::BadDate));
        };
        if item.link.trim().is_empty() {
            return Ok(IngestOutcome::Skipped(SkipReason::MissingLink));
        }

        let new_post = NewPost::new(feed_id, &item.title, item.link.trim(), published_at)
            .with_description(&item.description);

        match PostRepository::new(self.db.pool()).create(&new_post).await {
            Ok(post) => Ok(IngestOutcome::Inserted(post)),
            Err(GatorError::Conflict(_)) => Ok(IngestOutcome::Skipped(SkipReason::Duplicate)),
            Err(e) => Err(e),
        }
    }

    /// Ingest a batch in order, stopping early only on cancellation or a
    /// fatal store error.
    ///
    /// Per-item failures are logged and counted; they never abort the batch.
    pub async fn ingest_all(
        &self,
        feed_id: i64,
        items: &[RawItem],
        cancel: &CancellationToken,
    ) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();

        for item in items {
            if cancel.is_cancelled() {
                debug!(feed_id, "Ingestion cancelled after {} item(s)", summary.total());
                break;
            }

            match self.ingest(feed_id, item).await {
                Ok(outcome) => {
                    match &outcome {
                        IngestOutcome::Skipped(SkipReason::Duplicate) => {
                            debug!(feed_id, link = %item.link, "Skipped duplicate item");
                        }
                        IngestOutcome::Skipped(reason) => {
                            warn!(feed_id, link = %item.link, ?reason, "Skipped invalid item");
                        }
                        IngestOutcome::Inserted(_) => {}
                    }
                    summary.record(&outcome);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(feed_id, link = %item.link, "Failed to store post: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Parse a feed date: RFC 2822 (RSS `pubDate`) first, then RFC 3339 (Atom).
pub fn parse_published_at(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::feed::{FeedRepository, NewFeed};
    use chrono::TimeZone;

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();
        let repo = FeedRepository::new(db.pool());
        let a = repo
            .create(&NewFeed::new("A", "http://a/feed", user.id))
            .await
            .unwrap();
        let b = repo
            .create(&NewFeed::new("B", "http://b/feed", user.id))
            .await
            .unwrap();
        (db, a.id, b.id)
    }

    const DATE: &str = "Mon, 02 Jan 2006 15:04:05 +0000";

    #[test]
    fn test_parse_published_at_rfc2822() {
        let dt = parse_published_at(DATE).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_published_at_rfc1123_zone_name() {
        let dt = parse_published_at("Mon, 02 Jan 2006 15:04:05 GMT").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_published_at_rfc3339() {
        let dt = parse_published_at("2006-01-02T17:04:05+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_published_at_invalid() {
        assert!(parse_published_at("").is_none());
        assert!(parse_published_at("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_ingest_inserts() {
        let (db, feed_a, _) = setup().await;
        let ingester = PostIngester::new(db);

        let outcome = ingester
            .ingest(feed_a, &RawItem::new("Hello", "http://a/1", DATE))
            .await
            .unwrap();

        match outcome {
            IngestOutcome::Inserted(post) => {
                assert_eq!(post.title, "Hello");
                assert_eq!(post.feed_id, feed_a);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ingest_bad_date_skips_without_store() {
        let (db, feed_a, _) = setup().await;
        let ingester = PostIngester::new(db.clone());

        let outcome = ingester
            .ingest(feed_a, &RawItem::new("Hello", "http://a/1", "not a date"))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Skipped(SkipReason::BadDate));
        assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_missing_link() {
        let (db, feed_a, _) = setup().await;
        let ingester = PostIngester::new(db);

        let outcome = ingester
            .ingest(feed_a, &RawItem::new("Hello", "  ", DATE))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Skipped(SkipReason::MissingLink));
    }

    #[tokio::test]
    async fn test_ingest_duplicate_across_feeds() {
        let (db, feed_a, feed_b) = setup().await;
        let ingester = PostIngester::new(db.clone());
        let item = RawItem::new("Shared", "http://shared/1", DATE);

        assert!(matches!(
            ingester.ingest(feed_a, &item).await.unwrap(),
            IngestOutcome::Inserted(_)
        ));
        assert_eq!(
            ingester.ingest(feed_a, &item).await.unwrap(),
            IngestOutcome::Skipped(SkipReason::Duplicate)
        );
        assert_eq!(
            ingester.ingest(feed_b, &item).await.unwrap(),
            IngestOutcome::Skipped(SkipReason::Duplicate)
        );
        assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_all_isolates_bad_items() {
        let (db, feed_a, _) = setup().await;
        let ingester = PostIngester::new(db.clone());
        let items = vec![
            RawItem::new("one", "http://a/1", DATE),
            RawItem::new("two", "http://a/2", "garbage"),
            RawItem::new("three", "http://a/3", DATE),
        ];

        let summary = ingester
            .ingest_all(feed_a, &items, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            summary,
            IngestSummary {
                inserted: 2,
                duplicates: 0,
                invalid: 1,
                failed: 0,
            }
        );
        assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_all_stops_when_cancelled() {
        let (db, feed_a, _) = setup().await;
        let ingester = PostIngester::new(db.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = ingester
            .ingest_all(feed_a, &[RawItem::new("one", "http://a/1", DATE)], &cancel)
            .await
            .unwrap();

        assert_eq!(summary.total(), 0);
        assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 0);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ingest_all_warns_on_invalid_items() {
        let (db, feed_a, _) = setup().await;
        let ingester = PostIngester::new(db);
        let items = vec![
            RawItem::new("one", "http://a/1", DATE),
            RawItem::new("one again", "http://a/1", DATE),
            RawItem::new("two", "http://a/2", "garbage"),
            RawItem::new("three", "", DATE),
        ];

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let summary = ingester
            .ingest_all(feed_a, &items, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.invalid, 2);

        let text = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<&str> = text
            .lines()
            .filter(|l| l.contains("Skipped invalid item"))
            .collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|l| l.contains("WARN")));
        assert!(warnings[0].contains("link=http://a/2"));
        assert!(warnings[0].contains("reason=BadDate"));
        assert!(warnings[1].contains("reason=MissingLink"));
        assert!(!text.contains("Skipped duplicate item"));
    }
}
