//! OpenStreetMap Nominatim reverse geocoding
//!
//! `GET /reverse?format=jsonv2&lat=..&lon=..&zoom=10&addressdetails=1` returns either an
//! object with an `address` block or `{ "error": "Unable to geocode" }` when there is nothing
//! at this point (middle of the ocean).
//!
//! The usage policy requires an identifying user-agent and at most one request per second,
//! the significant-change filter upstream keeps us well below that.
//!

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, trace};

use wikiloc_common::Coordinate;

use crate::{PlaceResolver, ResolveError};

/// City level
const ZOOM: u8 = 10;

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
}

impl Address {
    /// Most specific locality name available
    ///
    fn locality(self) -> Option<String> {
        self.city.or(self.town).or(self.village).or(self.municipality)
    }
}

#[derive(Debug, Deserialize)]
struct Reverse {
    address: Option<Address>,
    error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Nominatim {
    /// Base site url taken from config
    pub base_url: String,
    /// reqwest client, carries the timeout
    pub client: Client,
}

impl Nominatim {
    #[tracing::instrument]
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ResolveError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Nominatim {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }
}

#[async_trait]
impl PlaceResolver for Nominatim {
    fn name(&self) -> String {
        "nominatim".to_string()
    }

    #[tracing::instrument(skip(self))]
    async fn resolve(&self, at: &Coordinate) -> Result<Option<String>, ResolveError> {
        let url = format!("{}/reverse", self.base_url);
        let query = [
            ("format", "jsonv2".to_string()),
            ("lat", at.lat.to_string()),
            ("lon", at.lon.to_string()),
            ("zoom", ZOOM.to_string()),
            ("addressdetails", "1".to_string()),
        ];
        trace!("Reverse lookup of {} at {}", at, url);

        let resp = http_get!(self, &url, &query).await?;
        match resp.status() {
            StatusCode::OK => (),
            code => return Err(ResolveError::Status(code.as_u16(), url)),
        }

        let data: Reverse = serde_json::from_str(&resp.text().await?)?;
        if let Some(err) = data.error {
            debug!("nothing at {}: {}", at, err);
            return Ok(None);
        }
        Ok(data.address.and_then(Address::locality))
    }
}
