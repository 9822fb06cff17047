//! Location related module
//!
//! v1: `Coordinate` (raw lat/lon pair as delivered by a geolocation source) and named
//!     `Location`s loaded from a gazetteer file.
//!
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::str::FromStr;

use eyre::Result;
use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::settings::Style;
use thiserror::Error;
use tracing::trace;

/// one degree is circumference of earth / 360°, convert into nautical miles
const ONE_DEG_NM: f64 = (40_000. / 1.852) / 360.;

/// Current location file version
const LOCATION_FILE_VER: usize = 1;

#[derive(Debug, Error, PartialEq)]
pub enum LocationError {
    #[error("Invalid coordinate '{0}'")]
    BadCoordinate(String),
    #[error("Coordinate out of range: {0}, {1}")]
    OutOfRange(f64, f64),
    #[error("Bad locations file version v{0}, need v{1}")]
    BadVersion(usize, usize),
}

/// A single position fix, in decimal degrees.
///
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Coordinate {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    /// Same as `new()` but reject anything that is not on Earth.
    ///
    pub fn checked(lat: f64, lon: f64) -> Result<Self, LocationError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90. || lon.abs() > 180. {
            return Err(LocationError::OutOfRange(lat, lon));
        }
        Ok(Coordinate { lat, lon })
    }

    /// Absolute latitude & longitude differences with `other`, in degrees.
    ///
    #[inline]
    pub fn delta(&self, other: &Coordinate) -> (f64, f64) {
        ((self.lat - other.lat).abs(), (self.lon - other.lon).abs())
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// Parse `"lat,lon"`, whitespace around each part is ignored.
///
impl FromStr for Coordinate {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || LocationError::BadCoordinate(s.to_string());

        let (lat, lon) = s.split_once(',').ok_or_else(bad)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| bad())?;
        let lon = lon.trim().parse::<f64>().map_err(|_| bad())?;
        Coordinate::checked(lat, lon)
    }
}

/// Named location from the gazetteer.
///
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Location {
    /// ISO country code, informative only
    pub country: Option<String>,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

impl Location {
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug)]
pub struct BB {
    /// Longitude - X0
    pub min_lon: f64,
    /// Latitude - Y0
    pub min_lat: f64,
    /// Longitude - X1
    pub max_lon: f64,
    /// Latitude - Y1
    pub max_lat: f64,
}

impl BB {
    /// Take a location and create a bounding box of `dist` nautical miles away
    ///
    /// So from (lat, lon) we generate the following bounding box:
    /// (lat - dist, lon - dist, lat + dist, lon + dist)
    ///
    #[tracing::instrument]
    pub fn from_location(value: &Location, dist: u32) -> Self {
        Self::from_lat_lon(value.lat, value.lon, dist)
    }

    /// Take a lat lot tuple and create a bounding box of `dist` nautical miles away
    ///
    /// NOTE: `dist` is in Nautical Miles
    ///
    #[tracing::instrument]
    pub fn from_lat_lon(lat: f64, lon: f64, dist: u32) -> Self {
        let dist = dist as f64 / ONE_DEG_NM;

        // Calculate the four corners
        //
        let (min_lat, max_lat) = (lat - dist, lat + dist);
        let (min_lon, max_lon) = (lon - dist, lon + dist);

        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Is the point inside (borders included)?
    ///
    pub fn contains(&self, at: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&at.lat)
            && (self.min_lon..=self.max_lon).contains(&at.lon)
    }
}

/// On-disk structure for the locations file
///
#[derive(Debug, Deserialize)]
struct LocationsFile {
    /// Version number for safety
    pub version: usize,
    /// List of locations
    pub location: BTreeMap<String, Location>,
}

/// Load all locations
///
#[tracing::instrument]
pub fn load_locations(fname: Option<String>) -> Result<BTreeMap<String, Location>> {
    trace!("enter");

    // Load from file if specified
    //
    let data = if let Some(fname) = fname {
        fs::read_to_string(fname)?
    } else {
        include_str!("locations.hcl").to_owned()
    };

    let loc: LocationsFile = hcl::from_str(&data)?;
    if loc.version != LOCATION_FILE_VER {
        return Err(LocationError::BadVersion(loc.version, LOCATION_FILE_VER).into());
    }
    Ok(loc.location)
}

/// Find the closest named location whose `dist` nm box contains `at`.
///
#[tracing::instrument(skip(data))]
pub fn nearest_location<'a>(
    data: &'a BTreeMap<String, Location>,
    at: &Coordinate,
    dist: u32,
) -> Option<(&'a String, &'a Location)> {
    data.iter()
        .filter(|(_, loc)| BB::from_location(loc, dist).contains(at))
        .min_by(|(_, a), (_, b)| {
            let (alat, alon) = a.coordinate().delta(at);
            let (blat, blon) = b.coordinate().delta(at);
            (alat * alat + alon * alon).total_cmp(&(blat * blat + blon * blon))
        })
}

/// List loaded locations
///
#[tracing::instrument(skip(data))]
pub fn list_locations(data: &BTreeMap<String, Location>, dist: u32) -> Result<String> {
    trace!("enter");
    let header = vec!["Location", "Country", "Lat/Lon", "Polygon"];

    let mut builder = Builder::default();
    builder.push_record(header);

    data.iter().for_each(|(name, loc)| {
        let country = loc.country.clone().unwrap_or("Unknown".to_string());
        let poly = BB::from_location(loc, dist);
        let point = format!("{:.4}, {:.4}", loc.lat, loc.lon);
        let poly = format!(
            "{:.2}, {:.2}, {:.2}, {:.2}",
            poly.min_lat, poly.min_lon, poly.max_lat, poly.max_lon
        );
        builder.push_record(vec![name.clone(), country, point, poly]);
    });

    let allf = builder.build().with(Style::modern()).to_string();
    Ok(format!("List all locations ({dist} nm):\n{allf}"))
}
