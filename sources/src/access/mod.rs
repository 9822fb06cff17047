//! Remote sites we talk to.
//!

pub use wikipedia::*;

#[cfg(feature = "nominatim")]
pub use nominatim::*;

mod wikipedia;

/// Public OSM Nominatim instance, config default even without the `nominatim` feature
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[cfg(feature = "nominatim")]
mod nominatim;
