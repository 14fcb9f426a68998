use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};

use crate::db::FeedStore;

use super::fetcher::FetchFeed;
use super::ingest::ingest;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a single scheduler cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// There are no feeds at all.
    NoFeeds,
    /// The store could not pick a feed.
    SelectionFailed,
    /// The fetch failed; the feed keeps its place at the head of the queue.
    FetchFailed { feed_id: i64 },
    /// The feed was fetched and its posts ingested.
    Fetched { feed_id: i64, found: usize, stored: usize },
}

/// Drives fetch + ingest for one feed per tick, oldest fetch first.
pub struct Scheduler<S, F, C = SystemClock> {
    store: S,
    fetcher: F,
    clock: C,
}

impl<S, F, C> Scheduler<S, F, C>
where
    S: FeedStore,
    F: FetchFeed,
    C: Clock,
{
    pub fn new(store: S, fetcher: F, clock: C) -> Self {
        Self {
            store,
            fetcher,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs a cycle on every tick of `every`, starting immediately. Only
    /// returns once `max_cycles` cycles have run; with `None` it runs until
    /// the process is stopped.
    pub async fn run(&self, every: Duration, max_cycles: Option<u64>) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles = 0u64;
        loop {
            if max_cycles.is_some_and(|max| cycles >= max) {
                return;
            }
            ticker.tick().await;
            match self.run_cycle().await {
                CycleOutcome::Fetched {
                    feed_id,
                    found,
                    stored,
                } => tracing::debug!(cycle = cycles, feed_id, found, stored, "Cycle finished"),
                CycleOutcome::FetchFailed { feed_id } => {
                    tracing::debug!(cycle = cycles, feed_id, "Cycle finished without fetch")
                }
                CycleOutcome::NoFeeds | CycleOutcome::SelectionFailed => {}
            }
            cycles += 1;
        }
    }

    /// Processes the single most stale feed. Never fails: every problem is
    /// logged and reported through the outcome.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let feed = match self.store.get_next_feed_to_fetch().await {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                tracing::info!("No feeds to fetch");
                return CycleOutcome::NoFeeds;
            }
            Err(e) => {
                tracing::error!("Failed to get next feed to fetch: {}", e);
                return CycleOutcome::SelectionFailed;
            }
        };

        tracing::info!(feed = %feed.name, url = %feed.url, "Fetching feed");

        let parsed = match self.fetcher.fetch(&feed.url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(feed = %feed.name, "Failed to fetch feed: {}", e);
                return CycleOutcome::FetchFailed { feed_id: feed.id };
            }
        };

        let stored = ingest(&self.store, &feed, &parsed).await;

        if let Err(e) = self.store.mark_feed_fetched(feed.id, self.clock.now()).await {
            tracing::error!(feed = %feed.name, "Failed to mark feed as fetched: {}", e);
        }

        tracing::info!(
            feed = %feed.name,
            found = parsed.items.len(),
            stored,
            "Feed collected"
        );

        CycleOutcome::Fetched {
            feed_id: feed.id,
            found: parsed.items.len(),
            stored,
        }
    }
}
