//! The location watching service.
//!
//! One instance owns all the state (last accepted coordinate, fetch pool) and processes
//! coordinates one at a time from a single channel, so no locking is needed for the filter.
//! The dispatcher (notification counter) is shared with the fetch workers.
//!
//! ```text
//! Idle -> AwaitingLocation -> Evaluating -+-> AwaitingLocation                (not significant)
//!                                         +-> NotifyingLocation -> FetchingContent -> AwaitingLocation
//! ```
//!
//! `FetchingContent -> NotifyingContent` then continues inside the fetch pool.
//!

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, trace, warn};

use wikiloc_common::Coordinate;
use wikiloc_sources::{Notifier, PlaceResolver, Related};

use crate::{Dispatcher, FetchPool, SignificanceFilter, Stats};

/// Default time given to pending fetches on shutdown
pub const GRACE: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum State {
    Idle,
    AwaitingLocation,
    Evaluating,
    NotifyingLocation,
    FetchingContent,
    NotifyingContent,
}

/// What happened to one coordinate
///
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Not a significant move
    Ignored,
    /// Significant, but no place name, notified with raw coordinates
    Unresolved,
    /// Significant and named, related content is on its way
    Resolved(String),
}

#[derive(Debug)]
pub struct Service {
    state: State,
    filter: SignificanceFilter,
    resolver: Box<dyn PlaceResolver>,
    dispatcher: Arc<Dispatcher>,
    pool: FetchPool,
    stats: Stats,
    grace: Duration,
}

impl Service {
    pub fn new(
        filter: SignificanceFilter,
        resolver: Box<dyn PlaceResolver>,
        related: Arc<dyn Related>,
        notifier: Arc<dyn Notifier>,
        workers: usize,
        grace: Duration,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(notifier));
        let pool = FetchPool::new(related, dispatcher.clone(), workers);
        Service {
            state: State::Idle,
            filter,
            resolver,
            dispatcher,
            pool,
            stats: Stats::default(),
            grace,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Last accepted coordinate
    ///
    #[inline]
    pub fn last(&self) -> Coordinate {
        self.filter.last()
    }

    fn set(&mut self, state: State) {
        trace!("{} -> {}", self.state, state);
        self.state = state;
    }

    /// Location updates are now requested.
    ///
    pub fn start(&mut self) {
        if self.state != State::Idle {
            return;
        }
        info!(
            "service started, resolver={} threshold={}",
            self.resolver.name(),
            self.filter.threshold()
        );
        self.dispatcher.started();
        self.set(State::AwaitingLocation);
    }

    /// Process one coordinate.
    ///
    #[tracing::instrument(skip(self))]
    pub async fn handle(&mut self, at: Coordinate) -> Step {
        self.set(State::Evaluating);
        self.stats.updates += 1;

        if !self.filter.accept(at) {
            debug!("not significant");
            self.stats.ignored += 1;
            self.set(State::AwaitingLocation);
            return Step::Ignored;
        }
        self.stats.accepted += 1;

        self.set(State::NotifyingLocation);
        let place = match self.resolver.resolve(&at).await {
            Ok(Some(place)) => Some(place),
            Ok(None) => {
                debug!("no place at {at}");
                None
            }
            Err(e) => {
                warn!("{} failed for {at}: {e}", self.resolver.name());
                None
            }
        };
        self.dispatcher.location(&at, place.as_deref());

        let step = match place {
            Some(place) => {
                self.stats.resolved += 1;
                self.set(State::FetchingContent);
                self.pool.submit(place.clone());
                Step::Resolved(place)
            }
            None => {
                self.stats.unresolved += 1;
                Step::Unresolved
            }
        };
        self.set(State::AwaitingLocation);
        step
    }

    /// Process coordinates until the channel is closed or `stop` completes, then shut down.
    ///
    pub async fn run<F>(mut self, mut rx: Receiver<Coordinate>, stop: F) -> Stats
    where
        F: Future<Output = ()>,
    {
        self.start();

        tokio::pin!(stop);
        loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("stop requested");
                    break;
                }
                at = rx.recv() => match at {
                    Some(at) => {
                        self.handle(at).await;
                    }
                    None => {
                        info!("no more coordinates");
                        break;
                    }
                },
            }
        }
        self.shutdown().await
    }

    /// Drain the fetch pool and merge all counters.
    ///
    pub async fn shutdown(self) -> Stats {
        let fetches = self.pool.shutdown(self.grace).await;
        let (notified, sink_errors) = self.dispatcher.counts();

        Stats {
            fetched: fetches.fetched,
            empty: fetches.empty,
            failed: fetches.failed,
            aborted: fetches.aborted,
            notified,
            sink_errors,
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use wikiloc_sources::{
        FetchError, Notification, NotifyError, RelatedArticle, ResolveError, Wikipedia,
        FETCH_TIMEOUT, WIKIPEDIA_API,
    };

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl Recorder {
        fn bodies(&self) -> Vec<(u64, String, Option<String>)> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .map(|n| (n.id, n.body.clone(), n.payload.clone()))
                .collect()
        }
    }

    impl Notifier for Recorder {
        fn name(&self) -> String {
            "recorder".to_string()
        }

        fn notify(&self, msg: &Notification) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }

    /// Resolves anything north of 9.9 as San José, fails south of the equator
    ///
    #[derive(Debug)]
    struct Fake;

    #[async_trait]
    impl PlaceResolver for Fake {
        fn name(&self) -> String {
            "fake".to_string()
        }

        async fn resolve(&self, at: &Coordinate) -> Result<Option<String>, ResolveError> {
            if at.lat < 0. {
                Err(ResolveError::Status(500, "fake".to_string()))
            } else if at.lat > 9.9 {
                Ok(Some("San José".to_string()))
            } else {
                Ok(None)
            }
        }
    }

    /// Canned answers, remembers the places asked for
    ///
    #[derive(Debug, Default)]
    struct Canned {
        answers: BTreeMap<String, Result<Vec<&'static str>, &'static str>>,
        asked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Related for Canned {
        fn name(&self) -> String {
            "canned".to_string()
        }

        async fn related(&self, place: &str) -> Result<Vec<RelatedArticle>, FetchError> {
            self.asked.lock().unwrap().push(place.to_string());
            match self.answers.get(place) {
                Some(Ok(titles)) => Ok(titles.iter().map(|t| RelatedArticle::new(t)).collect()),
                Some(Err(body)) => Err(wikiloc_sources::parse_related(body).unwrap_err()),
                None => Err(FetchError::Status(404, place.to_string())),
            }
        }
    }

    fn canned(answer: Result<Vec<&'static str>, &'static str>) -> Arc<Canned> {
        let mut answers = BTreeMap::new();
        answers.insert("San José".to_string(), answer);
        Arc::new(Canned {
            answers,
            ..Default::default()
        })
    }

    fn service(related: Arc<Canned>, rec: Arc<Recorder>) -> Service {
        Service::new(
            SignificanceFilter::default(),
            Box::new(Fake),
            related,
            rec,
            2,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_state_machine() {
        let rec = Arc::new(Recorder::default());
        let mut s = service(canned(Ok(vec!["A"])), rec.clone());

        assert_eq!(State::Idle, s.state());
        s.start();
        assert_eq!(State::AwaitingLocation, s.state());

        assert_eq!(Step::Ignored, s.handle(Coordinate::new(0.001, 0.001)).await);
        assert_eq!(State::AwaitingLocation, s.state());

        // Starting twice does not resend the startup notice
        //
        s.start();
        assert_eq!(1, rec.bodies().len());
    }

    #[tokio::test]
    async fn test_san_jose_scenario() {
        let rec = Arc::new(Recorder::default());
        let related = canned(Ok(vec!["A", "B", "C"]));
        let mut s = service(related.clone(), rec.clone());
        s.start();

        let first = Coordinate::new(9.9281, -84.0907);
        let second = Coordinate::new(9.9400, -84.0907);
        assert_eq!(Step::Resolved("San José".to_string()), s.handle(first).await);
        assert_eq!(Step::Resolved("San José".to_string()), s.handle(second).await);
        assert_eq!(second, s.last());

        let stats = s.shutdown().await;
        assert_eq!(2, stats.accepted);
        assert_eq!(2, stats.fetched);

        // No deduplication, every significant move fetches again
        //
        let asked = related.asked.lock().unwrap().clone();
        assert_eq!(vec!["San José", "San José"], asked);
        assert_eq!(
            "https://en.wikipedia.org/api/rest_v1/page/related/San_Jos%C3%A9",
            Wikipedia::new(WIKIPEDIA_API, FETCH_TIMEOUT)
                .unwrap()
                .related_url(&asked[0])
        );

        let bodies = rec.bodies();
        assert_eq!(5, bodies.len());
        assert_eq!((1, "Service running".to_string(), None), bodies[0]);
        assert_eq!(
            (
                3,
                "Current location: San José (Lat: 9.9281, Long: -84.0907)".to_string(),
                Some("San José".to_string())
            ),
            bodies[1]
        );
        let related: Vec<_> = bodies
            .iter()
            .filter(|(_, b, _)| b.contains("A, B, C"))
            .collect();
        assert_eq!(2, related.len());
    }

    #[tokio::test]
    async fn test_empty_related() {
        let rec = Arc::new(Recorder::default());
        let mut s = service(canned(Ok(vec![])), rec.clone());
        s.start();

        s.handle(Coordinate::new(9.94, -84.09)).await;
        let stats = s.shutdown().await;
        assert_eq!(1, stats.empty);
        // startup + location only
        assert_eq!(2, rec.bodies().len());
    }

    #[tokio::test]
    async fn test_malformed_related() {
        let rec = Arc::new(Recorder::default());
        let mut s = service(canned(Err("{ not json")), rec.clone());
        s.start();

        s.handle(Coordinate::new(9.94, -84.09)).await;
        let stats = s.shutdown().await;
        assert_eq!(1, stats.failed);
        assert_eq!(2, rec.bodies().len());
    }

    #[tokio::test]
    async fn test_resolution_failure_falls_back_to_coordinates() {
        let rec = Arc::new(Recorder::default());
        let related = canned(Ok(vec!["A"]));
        let mut s = service(related.clone(), rec.clone());
        s.start();

        assert_eq!(Step::Unresolved, s.handle(Coordinate::new(-33.45, -70.66)).await);
        assert_eq!(Step::Unresolved, s.handle(Coordinate::new(5.0, 5.0)).await);
        let stats = s.shutdown().await;
        assert_eq!(2, stats.unresolved);
        assert!(related.asked.lock().unwrap().is_empty());

        let bodies = rec.bodies();
        assert_eq!(
            (
                3,
                "Location: Latitude: -33.45, Longitude: -70.66".to_string(),
                None
            ),
            bodies[1]
        );
        assert_eq!(4, bodies[2].0);
    }

    #[tokio::test]
    async fn test_run_until_channel_closed() {
        let rec = Arc::new(Recorder::default());
        let s = service(canned(Ok(vec!["A", "B"])), rec.clone());

        let (tx, rx) = mpsc::channel(8);
        for (lat, lon) in [(9.9281, -84.0907), (9.9290, -84.0907), (9.9400, -84.0907)] {
            tx.send(Coordinate::new(lat, lon)).await.unwrap();
        }
        drop(tx);

        let stats = s.run(rx, std::future::pending::<()>()).await;
        assert_eq!(3, stats.updates);
        assert_eq!(1, stats.ignored);
        assert_eq!(2, stats.accepted);
        assert_eq!(2, stats.fetched);
        // startup + 2 locations + 2 related
        assert_eq!(5, stats.notified);
        assert_eq!(0, stats.sink_errors);
    }

    #[tokio::test]
    async fn test_run_stopped() {
        let rec = Arc::new(Recorder::default());
        let s = service(canned(Ok(vec!["A"])), rec.clone());

        let (_tx, rx) = mpsc::channel::<Coordinate>(8);
        let stats = s.run(rx, async {}).await;
        assert_eq!(0, stats.updates);
        assert_eq!(1, stats.notified);
    }
}
