use thiserror::Error;

/// Errors from the related-content side, allow us to differentiate between errors.
///
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP Error: {0}")]
    HTTP(#[from] reqwest::Error),
    #[error("Timeout fetching {0}")]
    Timeout(String),
    #[error("Error({0}) fetching {1}")]
    Status(u16, String),
    #[error("Can not decode answer: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Sort out timeouts from the other transport errors.
    ///
    pub fn from_transport(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(url.to_string())
        } else {
            FetchError::HTTP(e)
        }
    }
}

/// Reverse geocoding errors
///
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("HTTP Error: {0}")]
    HTTP(#[from] reqwest::Error),
    #[error("Error({0}) from {1}")]
    Status(u16, String),
    #[error("Can not decode answer: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Can not load locations: {0}")]
    Locations(String),
}

/// Geolocation source errors
///
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad track file: {0}")]
    Csv(#[from] csv::Error),
}

/// Notification sink errors
///
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Can not encode notification: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Sink is poisoned")]
    Poisoned,
}
