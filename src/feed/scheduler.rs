//! Periodic fetch loop.
//!
//! One tick fetches one feed: select the stalest feed, mark it fetched,
//! fetch it, ingest its items. Ticks never overlap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::fetcher::FeedParser;
use super::ingester::{IngestSummary, PostIngester};
use super::repository::FeedRepository;
use super::selector::FeedSelector;
use super::types::Feed;
use crate::db::Database;
use crate::{GatorError, Result};

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// There were no feeds to fetch.
    Idle,
    /// Another tick was still running; nothing was done.
    Busy,
    /// Selecting or marking the feed failed.
    Failed(GatorError),
    /// The feed was marked but fetching or parsing it failed.
    FetchFailed { feed: Feed, error: GatorError },
    /// The feed was fetched and its items ingested.
    Fetched { feed: Feed, summary: IngestSummary },
}

impl TickOutcome {
    /// The fatal store error behind this outcome, if any.
    fn fatal_error(self) -> Option<GatorError> {
        match self {
            TickOutcome::Failed(e) if e.is_fatal() => Some(e),
            _ => None,
        }
    }
}

/// Clears the in-progress flag when a tick ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives fetch cycles at a fixed period.
pub struct FetchScheduler {
    db: Database,
    selector: FeedSelector,
    ingester: PostIngester,
    parser: Arc<dyn FeedParser>,
    period: Duration,
    max_items: Option<usize>,
    in_progress: AtomicBool,
}

impl FetchScheduler {
    /// Create a scheduler that ticks every `period`.
    pub fn new(db: Database, parser: Arc<dyn FeedParser>, period: Duration) -> Self {
        Self {
            selector: FeedSelector::new(db.clone()),
            ingester: PostIngester::new(db.clone()),
            db,
            parser,
            period,
            max_items: None,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Cap the number of items ingested per tick. 0 means no cap.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = (max_items > 0).then_some(max_items);
        self
    }

    /// Whether a tick is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run one fetch cycle.
    pub async fn tick(&self) -> TickOutcome {
        self.tick_with_cancel(&CancellationToken::new()).await
    }

    async fn tick_with_cancel(&self, cancel: &CancellationToken) -> TickOutcome {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Fetch cycle already in progress, skipping tick");
            return TickOutcome::Busy;
        }
        let _guard = CycleGuard(&self.in_progress);

        let feed = match self.selector.next().await {
            Ok(feed) => feed,
            Err(GatorError::NoFeeds) => {
                debug!("No feeds to fetch");
                return TickOutcome::Idle;
            }
            Err(e) => {
                error!("Couldn't select next feed: {}", e);
                return TickOutcome::Failed(e);
            }
        };

        // Marked before fetching so a broken feed still yields its turn.
        match FeedRepository::new(self.db.pool())
            .mark_fetched(feed.id, Utc::now())
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(feed_id = feed.id, "Feed disappeared before it could be marked");
                return TickOutcome::Failed(GatorError::NotFound(format!("feed {}", feed.id)));
            }
            Err(e) => {
                error!(feed_id = feed.id, "Couldn't mark feed as fetched: {}", e);
                return TickOutcome::Failed(e);
            }
        }

        debug!(feed_id = feed.id, url = %feed.url, "Fetching feed");
        let parsed = match self.parser.fetch(&feed.url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(feed_id = feed.id, url = %feed.url, "Couldn't fetch feed: {}", e);
                return TickOutcome::FetchFailed { feed, error: e };
            }
        };

        let items = match self.max_items {
            Some(max) if parsed.items.len() > max => &parsed.items[..max],
            _ => &parsed.items[..],
        };

        let summary = match self.ingester.ingest_all(feed.id, items, cancel).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(feed_id = feed.id, "Ingestion aborted: {}", e);
                return TickOutcome::Failed(e);
            }
        };

        if summary.inserted > 0 {
            info!(
                "Feed {} ({}) fetched: {} new post(s), {} duplicate(s), {} invalid, {} failed",
                feed.name,
                feed.url,
                summary.inserted,
                summary.duplicates,
                summary.invalid,
                summary.failed
            );
        } else {
            debug!(
                "Feed {} ({}) fetched: no new posts ({} item(s))",
                feed.name,
                feed.url,
                summary.total()
            );
        }

        TickOutcome::Fetched { feed, summary }
    }

    /// Tick every period until `cancel` fires.
    ///
    /// The first tick runs immediately. A fatal store error ends the loop
    /// with that error; every other failure waits for the next tick.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!("Collecting feeds every {:?}", self.period);

        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            if cancel.is_cancelled() {
                break;
            }

            if let Some(e) = self.tick_with_cancel(&cancel).await.fatal_error() {
                error!("Fetch loop stopping: {}", e);
                return Err(e);
            }
        }

        info!("Fetch loop stopped");
        Ok(())
    }
}
