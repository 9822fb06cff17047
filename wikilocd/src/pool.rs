//! Bounded pool for related-content fetches.
//!
//! Each significant move with a known place name gets its own task, but no more than
//! `workers` of them talk to the remote site at the same time.  Tasks are tracked in a
//! `JoinSet` so that finished ones can be accounted for and pending ones drained (or aborted)
//! on shutdown.
//!

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, trace, warn};

use wikiloc_sources::{FetchError, Related};

use crate::{Dispatcher, State, Stats};

/// Default number of concurrent fetches
pub const WORKERS: usize = 4;

/// What happened to one fetch
///
#[derive(Debug)]
pub enum FetchOutcome {
    /// Notification `id` sent with `count` titles
    Notified { place: String, id: u64, count: usize },
    /// Nothing related
    Empty(String),
    /// Abandoned
    Failed(String, FetchError),
}

#[derive(Debug)]
pub struct FetchPool {
    related: Arc<dyn Related>,
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<FetchOutcome>,
    stats: Stats,
}

/// One fetch, from waiting for a free slot to the notification.
///
#[tracing::instrument(skip(related, dispatcher, permits))]
async fn fetch_one(
    related: Arc<dyn Related>,
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
    place: String,
) -> FetchOutcome {
    // The semaphore is never closed
    //
    let _permit = permits.acquire_owned().await;
    trace!("{}", State::FetchingContent);

    match related.related(&place).await {
        Ok(articles) => {
            trace!("{}", State::NotifyingContent);
            match dispatcher.related(&place, &articles) {
                Some(id) => FetchOutcome::Notified {
                    place,
                    id,
                    count: articles.len(),
                },
                None => FetchOutcome::Empty(place),
            }
        }
        Err(e) => FetchOutcome::Failed(place, e),
    }
}

impl FetchPool {
    pub fn new(related: Arc<dyn Related>, dispatcher: Arc<Dispatcher>, workers: usize) -> Self {
        FetchPool {
            related,
            dispatcher,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            tasks: JoinSet::new(),
            stats: Stats::default(),
        }
    }

    /// Queue a fetch for `place`, never waits.
    ///
    pub fn submit(&mut self, place: String) {
        self.reap();

        debug!("fetching related content for {place} from {}", self.related.name());
        self.tasks.spawn(fetch_one(
            self.related.clone(),
            self.dispatcher.clone(),
            self.permits.clone(),
            place,
        ));
    }

    /// Fetches not yet accounted for
    ///
    #[inline]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Fetch part of the stats
    ///
    #[inline]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Account for everything already finished.
    ///
    fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            self.record(res);
        }
    }

    fn record(&mut self, res: Result<FetchOutcome, JoinError>) {
        match res {
            Ok(FetchOutcome::Notified { place, id, count }) => {
                debug!("{place}: {count} related, notification #{id}");
                self.stats.fetched += 1;
            }
            Ok(FetchOutcome::Empty(place)) => {
                debug!("{place}: nothing related");
                self.stats.empty += 1;
            }
            Ok(FetchOutcome::Failed(place, e)) => {
                warn!("{place}: fetch abandoned: {e}");
                self.stats.failed += 1;
            }
            Err(e) if e.is_cancelled() => {
                self.stats.aborted += 1;
            }
            Err(e) => {
                warn!("fetch task died: {e}");
                self.stats.failed += 1;
            }
        }
    }

    /// Wait for every pending fetch.
    ///
    pub async fn drain(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            self.record(res);
        }
    }

    /// Give pending fetches `grace` to finish, abort the rest.
    ///
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(mut self, grace: Duration) -> Stats {
        info!("{} fetches pending", self.pending());

        if tokio::time::timeout(grace, self.drain()).await.is_err() {
            warn!("grace period over, aborting {} fetches", self.pending());
            self.tasks.abort_all();
            self.drain().await;
        }
        self.stats
    }
}
