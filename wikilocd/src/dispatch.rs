//! Notification dispatch.
//!
//! Every notification gets a freshly incremented identity so they do not replace each other
//! on the user side.  Identity 1 is reserved for the "service running" notice sent at start,
//! event notifications start at 3.
//!
//! The dispatcher is shared between the service loop and the fetch workers, hence the atomics.
//!

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use wikiloc_common::Coordinate;
use wikiloc_sources::{Notification, Notifier, RelatedArticle};

/// Identity of the startup notice
pub const SERVICE_ID: u64 = 1;
/// Counter value before the first event notification
const FIRST_ID: u64 = 2;

/// Title of the startup notice
pub const SERVICE_TITLE: &str = "Location Service";
/// Title of every event notification
pub const TITLE: &str = "Location Service Notification";

/// Body for the location notice.
///
pub fn location_message(at: &Coordinate, place: Option<&str>) -> String {
    match place {
        Some(place) => format!(
            "Current location: {} (Lat: {}, Long: {})",
            place, at.lat, at.lon
        ),
        None => format!("Location: Latitude: {}, Longitude: {}", at.lat, at.lon),
    }
}

/// Body for the related-content notice, `None` when there is nothing to say.
///
pub fn related_message(articles: &[RelatedArticle]) -> Option<String> {
    if articles.is_empty() {
        return None;
    }
    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    Some(format!("Related Wikipedia content: {}", titles.join(", ")))
}

#[derive(Debug)]
pub struct Dispatcher {
    counter: AtomicU64,
    sent: AtomicU64,
    errors: AtomicU64,
    sink: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn Notifier>) -> Self {
        Dispatcher {
            counter: AtomicU64::new(FIRST_ID),
            sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            sink,
        }
    }

    /// Never returns the same value twice.
    ///
    #[inline]
    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// (sent, refused by the sink)
    ///
    pub fn counts(&self) -> (u64, u64) {
        (
            self.sent.load(Ordering::SeqCst),
            self.errors.load(Ordering::SeqCst),
        )
    }

    /// Hand over to the sink, failures are logged and counted, nothing more.
    ///
    fn send(&self, msg: Notification) -> u64 {
        debug!(id = msg.id, "notify: {}", msg.body);
        match self.sink.notify(&msg) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                warn!("{} could not display #{}: {}", self.sink.name(), msg.id, e);
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
        }
        msg.id
    }

    /// Startup notice.
    ///
    pub fn started(&self) -> u64 {
        self.send(Notification::new(
            SERVICE_ID,
            SERVICE_TITLE,
            "Service running",
            None,
        ))
    }

    /// Send an event notification, returns its identity.
    ///
    pub fn dispatch(&self, body: &str, payload: Option<&str>) -> u64 {
        let id = self.next_id();
        self.send(Notification::new(id, TITLE, body, payload))
    }

    /// Where we are, by name when we have one.
    ///
    pub fn location(&self, at: &Coordinate, place: Option<&str>) -> u64 {
        self.dispatch(&location_message(at, place), place)
    }

    /// What is around, nothing is sent for an empty list.
    ///
    pub fn related(&self, place: &str, articles: &[RelatedArticle]) -> Option<u64> {
        related_message(articles).map(|body| self.dispatch(&body, Some(place)))
    }
}
