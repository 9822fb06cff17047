//! Daemon configuration.
//!
//! Loaded through `ConfigFile` from `$HOME/.config/wikiloc/wikilocd.hcl`, a file given on the
//! command line or the built-in `wikilocd.hcl`.  Every key except `version` has a default.
//!

use std::sync::Arc;
use std::time::Duration;

use eyre::{eyre, Result};
use serde::Deserialize;
use strum::{EnumString, VariantNames};
use tracing::trace;

use wikiloc_common::IntoConfig;
use wikiloc_sources::{
    Cadence, Console, Gazetteer, LogNotifier, NoResolver, Notifier, OutputFormat, PlaceResolver,
    Wikipedia, FETCH_TIMEOUT, NOMINATIM_URL, RADIUS, WIKIPEDIA_API,
};

#[cfg(feature = "nominatim")]
use wikiloc_sources::Nominatim;

use crate::{GRACE, THRESHOLD, WORKERS};

/// Current version of the config file
pub const CVERSION: usize = 1;

/// Which place resolver to use
///
#[derive(
    Clone, Copy, Debug, Default, Deserialize, EnumString, PartialEq, strum::Display, VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Named locations from a file
    #[default]
    Gazetteer,
    /// OpenStreetMap
    Nominatim,
    /// Coordinates only
    None,
}

/// Where do notifications go
///
#[derive(
    Clone, Copy, Debug, Default, Deserialize, EnumString, PartialEq, strum::Display, VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Log,
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub version: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// HTTP timeout (s)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Concurrent fetches
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Shutdown grace period (s)
    #[serde(default = "default_grace")]
    pub grace: u64,
    /// Nominal location interval (s)
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Minimum location interval (s)
    #[serde(default = "default_min_interval")]
    pub min_interval: u64,
    #[serde(default)]
    pub resolver: ResolverKind,
    /// Gazetteer file, built-in list if not set
    pub locations: Option<String>,
    /// Gazetteer radius (nm)
    #[serde(default = "default_radius")]
    pub radius: u32,
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    #[serde(default)]
    pub notifier: NotifierKind,
}

fn default_threshold() -> f64 {
    THRESHOLD
}

fn default_api_url() -> String {
    WIKIPEDIA_API.to_string()
}

fn default_timeout() -> u64 {
    FETCH_TIMEOUT.as_secs()
}

fn default_workers() -> usize {
    WORKERS
}

fn default_grace() -> u64 {
    GRACE.as_secs()
}

fn default_interval() -> u64 {
    Cadence::default().interval.as_secs()
}

fn default_min_interval() -> u64 {
    Cadence::default().min_interval.as_secs()
}

fn default_radius() -> u32 {
    RADIUS
}

fn default_nominatim_url() -> String {
    NOMINATIM_URL.to_string()
}

impl IntoConfig for Settings {
    const VERSION: usize = CVERSION;
    const FILENAME: &'static str = "wikilocd.hcl";

    fn version(&self) -> usize {
        self.version
    }

    fn builtin() -> &'static str {
        include_str!("wikilocd.hcl")
    }
}

impl Settings {
    /// Reject values that make no sense before starting anything.
    ///
    pub fn check(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0. {
            return Err(eyre!("threshold must be a positive number of degrees"));
        }
        if self.timeout == 0 {
            return Err(eyre!("timeout must be at least 1s"));
        }
        if self.workers == 0 {
            return Err(eyre!("need at least one worker"));
        }
        Ok(())
    }

    pub fn cadence(&self) -> Cadence {
        Cadence {
            interval: Duration::from_secs(self.interval),
            min_interval: Duration::from_secs(self.min_interval),
        }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[inline]
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace)
    }

    #[tracing::instrument(skip(self))]
    pub fn resolver(&self) -> Result<Box<dyn PlaceResolver>> {
        trace!("resolver = {}", self.resolver);
        let r: Box<dyn PlaceResolver> = match self.resolver {
            ResolverKind::Gazetteer => {
                Box::new(Gazetteer::load(self.locations.clone(), self.radius)?)
            }
            #[cfg(feature = "nominatim")]
            ResolverKind::Nominatim => {
                Box::new(Nominatim::new(&self.nominatim_url, self.timeout())?)
            }
            #[cfg(not(feature = "nominatim"))]
            ResolverKind::Nominatim => return Err(eyre!("built without nominatim support")),
            ResolverKind::None => Box::new(NoResolver),
        };
        Ok(r)
    }

    pub fn related(&self) -> Result<Wikipedia> {
        Ok(Wikipedia::new(&self.api_url, self.timeout())?)
    }

    /// `format` overrides the configured notifier.
    ///
    pub fn notifier(&self, format: Option<NotifierKind>) -> Arc<dyn Notifier> {
        match format.unwrap_or(self.notifier) {
            NotifierKind::Log => Arc::new(LogNotifier),
            NotifierKind::Text => Arc::new(Console::stdout(OutputFormat::Text)),
            NotifierKind::Json => Arc::new(Console::stdout(OutputFormat::Json)),
        }
    }
}
