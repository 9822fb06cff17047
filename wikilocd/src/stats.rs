use std::fmt::{Display, Formatter};

/// Statistics gathering struct, filled by the service, the fetch pool and the dispatcher.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    /// Coordinates received
    pub updates: u64,
    /// Not significant
    pub ignored: u64,
    /// Significant
    pub accepted: u64,
    /// Place name found
    pub resolved: u64,
    /// Resolver failed or found nothing
    pub unresolved: u64,
    /// Fetches that produced a notification
    pub fetched: u64,
    /// Fetches with no related content
    pub empty: u64,
    /// Fetches that failed
    pub failed: u64,
    /// Fetches still running at shutdown
    pub aborted: u64,
    /// Notifications handed to the sink
    pub notified: u64,
    /// Notifications the sink refused
    pub sink_errors: u64,
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "updates={} ignored={} accepted={} resolved={} unresolved={} fetched={} empty={} failed={} aborted={} notified={} sink_errors={}",
            self.updates,
            self.ignored,
            self.accepted,
            self.resolved,
            self.unresolved,
            self.fetched,
            self.empty,
            self.failed,
            self.aborted,
            self.notified,
            self.sink_errors
        )
    }
}
