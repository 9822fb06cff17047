//! Location watcher core: significant-change filter, notification dispatch, bounded pool of
//! related-content fetches and the service tying them together.
//!

pub use config::*;
pub use dispatch::*;
pub use filter::*;
pub use pool::*;
pub use service::*;
pub use stats::*;

mod config;
mod dispatch;
mod filter;
mod pool;
mod service;
mod stats;
