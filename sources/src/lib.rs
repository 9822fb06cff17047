//! Module to deal with the different collaborators of the location watcher.
//!
//! The different submodules deal with:
//!
//! - where coordinates come from (`Geolocator`),
//! - turning coordinates into a locality name (`PlaceResolver`),
//! - fetching related content for a place (`Related`),
//! - telling the user (`Notifier`).
//!

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use wikiloc_common::Coordinate;

// Re-export these modules for a shorted import path.
//
pub use access::*;
pub use error::*;
pub use gazetteer::*;
pub use geo::*;
pub use notify::*;

#[macro_use]
mod macros;

mod access;
mod error;
mod gazetteer;
mod geo;
mod notify;

/// Something delivering position fixes.
///
#[async_trait]
pub trait Geolocator: Debug + Send {
    /// Return source's name
    fn name(&self) -> String;
    /// Deliver coordinates into `out` until exhausted or until nobody listens anymore
    async fn run(&mut self, out: Sender<Coordinate>) -> Result<(), SourceError>;
}

/// Reverse geocoding: coordinates in, at most one locality name out.
///
#[async_trait]
pub trait PlaceResolver: Debug + Send + Sync {
    /// Return resolver's name
    fn name(&self) -> String;
    /// `Ok(None)` means the lookup worked but nothing is there
    async fn resolve(&self, at: &Coordinate) -> Result<Option<String>, ResolveError>;
}

/// Fetch content related to a given place.
///
#[async_trait]
pub trait Related: Debug + Send + Sync {
    /// Return site's name
    fn name(&self) -> String;
    /// One call, no retry, articles in the order the site gave them
    async fn related(&self, place: &str) -> Result<Vec<RelatedArticle>, FetchError>;
}

/// Surface a notification to the user, no acknowledgment.
///
pub trait Notifier: Debug + Send + Sync {
    /// Return sink's name
    fn name(&self) -> String;
    /// Display the message
    fn notify(&self, msg: &Notification) -> Result<(), NotifyError>;
}

pub fn version() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
