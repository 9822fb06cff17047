//! Offline place resolvers.
//!
//! `Gazetteer` picks the closest named location around the point, `NoResolver` never finds
//! anything and is there for setups without any geocoding.
//!

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, trace};

use wikiloc_common::{load_locations, nearest_location, Coordinate, Location};

use crate::{PlaceResolver, ResolveError};

/// Default search radius, in nm
pub const RADIUS: u32 = 10;

#[derive(Clone, Debug)]
pub struct Gazetteer {
    /// Named locations
    pub locations: BTreeMap<String, Location>,
    /// How far from a location do we still consider being there (nm)
    pub radius: u32,
}

impl Gazetteer {
    /// Load from `fname` or use the built-in list.
    ///
    #[tracing::instrument]
    pub fn load(fname: Option<String>, radius: u32) -> Result<Self, ResolveError> {
        let locations =
            load_locations(fname).map_err(|e| ResolveError::Locations(e.to_string()))?;
        trace!("{} locations loaded", locations.len());
        Ok(Gazetteer { locations, radius })
    }
}

#[async_trait]
impl PlaceResolver for Gazetteer {
    fn name(&self) -> String {
        "gazetteer".to_string()
    }

    async fn resolve(&self, at: &Coordinate) -> Result<Option<String>, ResolveError> {
        let found = nearest_location(&self.locations, at, self.radius).map(|(name, _)| name.clone());
        debug!("{} -> {:?}", at, found);
        Ok(found)
    }
}

/// Never resolves anything, every notification carries raw coordinates.
///
#[derive(Clone, Debug, Default)]
pub struct NoResolver;

#[async_trait]
impl PlaceResolver for NoResolver {
    fn name(&self) -> String {
        "none".to_string()
    }

    async fn resolve(&self, _at: &Coordinate) -> Result<Option<String>, ResolveError> {
        Ok(None)
    }
}
