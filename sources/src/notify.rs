//! Notification sinks.
//!
//! A `Notification` is what the user gets to see: an identity (so that successive ones do not
//! replace each other), a title, a body and an optional payload (the place name) that a
//! front-end can use to open the matching article.
//!

use std::fmt::{Debug, Formatter};
use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, VariantNames};
use tracing::info;

use crate::{Notifier, NotifyError};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    /// Identity, always freshly incremented
    pub id: u64,
    pub title: String,
    pub body: String,
    /// Deep-link payload, the resolved place name
    pub payload: Option<String>,
    pub stamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(id: u64, title: &str, body: &str, payload: Option<&str>) -> Self {
        Notification {
            id,
            title: title.to_string(),
            body: body.to_string(),
            payload: payload.map(String::from),
            stamp: Utc::now(),
        }
    }
}

/// Output formats for `Console`
///
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    EnumString,
    PartialEq,
    Serialize,
    strum::Display,
    VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One readable line per notification
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Goes to the log, nothing else.
///
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> String {
        "log".to_string()
    }

    fn notify(&self, msg: &Notification) -> Result<(), NotifyError> {
        info!(id = msg.id, payload = ?msg.payload, "{}: {}", msg.title, msg.body);
        Ok(())
    }
}

/// Write notifications to a terminal, a pipe, a file…
///
pub struct Console {
    pub format: OutputFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Debug for Console {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("format", &self.format)
            .finish()
    }
}

impl Console {
    pub fn new(format: OutputFormat, out: Box<dyn Write + Send>) -> Self {
        Console {
            format,
            out: Mutex::new(out),
        }
    }

    pub fn stdout(format: OutputFormat) -> Self {
        Console::new(format, Box::new(std::io::stdout()))
    }

    /// Render one notification, without end of line.
    ///
    pub fn render(&self, msg: &Notification) -> Result<String, NotifyError> {
        Ok(match self.format {
            OutputFormat::Text => match &msg.payload {
                Some(place) => format!("[#{}] {}: {} ({})", msg.id, msg.title, msg.body, place),
                None => format!("[#{}] {}: {}", msg.id, msg.title, msg.body),
            },
            OutputFormat::Json => serde_json::to_string(msg)?,
        })
    }
}

impl Notifier for Console {
    fn name(&self) -> String {
        format!("console:{}", self.format)
    }

    fn notify(&self, msg: &Notification) -> Result<(), NotifyError> {
        let line = self.render(msg)?;
        let mut out = self.out.lock().map_err(|_| NotifyError::Poisoned)?;
        writeln!(out, "{}", line)?;
        Ok(out.flush()?)
    }
}
