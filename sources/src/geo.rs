//! Geolocation sources.
//!
//! - `TrackFile` replays a CSV track (`lat,lon` columns) at the nominal interval, this is how
//!   we feed recorded movements into the daemon.
//! - `LineSource` reads one `lat,lon` per line from any async reader (stdin by default, so a
//!   GPS daemon can be piped in).  Fixes arriving faster than the minimum interval are
//!   coalesced: only the latest one is kept and delivered once the interval is over, or at
//!   end of input.
//!

use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use wikiloc_common::Coordinate;

use crate::{Geolocator, SourceError};

/// Nominal delay between two fixes
pub const INTERVAL: Duration = Duration::from_secs(10);
/// Never deliver two fixes closer than this
pub const MIN_INTERVAL: Duration = Duration::from_secs(5);

/// How often do we deliver coordinates
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cadence {
    pub interval: Duration,
    pub min_interval: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence {
            interval: INTERVAL,
            min_interval: MIN_INTERVAL,
        }
    }
}

/// Replay a recorded track.
///
#[derive(Clone, Debug)]
pub struct TrackFile {
    pub path: PathBuf,
    pub cadence: Cadence,
}

impl TrackFile {
    pub fn new(path: PathBuf, cadence: Cadence) -> Self {
        TrackFile { path, cadence }
    }

    /// Read the whole track, bad rows are skipped.
    ///
    #[tracing::instrument(skip(self))]
    pub fn read(&self) -> Result<Vec<Coordinate>, SourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(&self.path)?;

        let mut points = vec![];
        for (n, rec) in rdr.deserialize::<Coordinate>().enumerate() {
            match rec {
                Ok(c) => match Coordinate::checked(c.lat, c.lon) {
                    Ok(c) => points.push(c),
                    Err(e) => warn!("row {}: {}", n + 1, e),
                },
                Err(e) => warn!("row {}: {}", n + 1, e),
            }
        }
        trace!("{} points in {:?}", points.len(), self.path);
        Ok(points)
    }
}

#[async_trait]
impl Geolocator for TrackFile {
    fn name(&self) -> String {
        format!("track:{}", self.path.to_string_lossy())
    }

    #[tracing::instrument(skip(self, out))]
    async fn run(&mut self, out: Sender<Coordinate>) -> Result<(), SourceError> {
        let points = self.read()?;

        // `interval()` panics on a zero period
        //
        let mut tick = if self.cadence.interval.is_zero() {
            None
        } else {
            Some(tokio::time::interval(self.cadence.interval))
        };

        for c in points {
            if let Some(tick) = tick.as_mut() {
                tick.tick().await;
            }
            if out.send(c).await.is_err() {
                debug!("receiver gone, stopping");
                break;
            }
        }
        Ok(())
    }
}

/// Read fixes as text lines.
///
pub struct LineSource<R> {
    name: String,
    reader: R,
    pub cadence: Cadence,
}

impl<R> Debug for LineSource<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("name", &self.name)
            .field("cadence", &self.cadence)
            .finish()
    }
}

impl LineSource<BufReader<tokio::io::Stdin>> {
    pub fn stdin(cadence: Cadence) -> Self {
        LineSource::new("stdin", BufReader::new(tokio::io::stdin()), cadence)
    }
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(name: &str, reader: R, cadence: Cadence) -> Self {
        LineSource {
            name: name.to_string(),
            reader,
            cadence,
        }
    }
}

#[async_trait]
impl<R> Geolocator for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    #[tracing::instrument(skip(self, out))]
    async fn run(&mut self, out: Sender<Coordinate>) -> Result<(), SourceError> {
        let min_interval = self.cadence.min_interval;
        let mut last: Option<Instant> = None;
        let mut pending: Option<Coordinate> = None;
        let mut lines = (&mut self.reader).lines();

        loop {
            let due = last.map(|t| t + min_interval);

            tokio::select! {
                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => break,
                    };
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }

                    let c: Coordinate = match line.parse() {
                        Ok(c) => c,
                        Err(e) => {
                            warn!("{}: {}", self.name, e);
                            continue;
                        }
                    };

                    match due {
                        Some(due) if Instant::now() < due => {
                            trace!("too soon, holding {}", c);
                            pending = Some(c);
                        }
                        _ => {
                            pending = None;
                            if !deliver(&out, c).await {
                                return Ok(());
                            }
                            last = Some(Instant::now());
                        }
                    }
                }
                _ = sleep_until(due.unwrap_or_else(Instant::now)), if pending.is_some() => {
                    if let Some(c) = pending.take() {
                        if !deliver(&out, c).await {
                            return Ok(());
                        }
                        last = Some(Instant::now());
                    }
                }
            }
        }

        // Nothing more will come, the held fix is the latest position
        //
        if let Some(c) = pending {
            deliver(&out, c).await;
        }
        Ok(())
    }
}

/// Returns `false` when nobody listens anymore.
///
async fn deliver(out: &Sender<Coordinate>, c: Coordinate) -> bool {
    if out.send(c).await.is_err() {
        debug!("receiver gone, stopping");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;

    use super::*;

    fn fast() -> Cadence {
        Cadence {
            interval: Duration::ZERO,
            min_interval: Duration::ZERO,
        }
    }

    async fn collect(mut src: impl Geolocator, size: usize) -> Vec<Coordinate> {
        let (tx, mut rx) = mpsc::channel(size);
        src.run(tx).await.unwrap();

        let mut all = vec![];
        while let Some(c) = rx.recv().await {
            all.push(c);
        }
        all
    }

    #[tokio::test]
    async fn test_track_file() {
        let dir = tempfile::tempdir().unwrap();
        let fname = dir.path().join("track.csv");
        fs::write(
            &fname,
            "lat,lon\n# start\n9.9281,-84.0907\n9.9400,-84.0907\nbad,row\n95.0,0.0\n",
        )
        .unwrap();

        let src = TrackFile::new(fname, fast());
        let all = collect(src, 10).await;
        assert_eq!(
            vec![
                Coordinate::new(9.9281, -84.0907),
                Coordinate::new(9.9400, -84.0907)
            ],
            all
        );
    }

    #[tokio::test]
    async fn test_track_file_missing() {
        let mut src = TrackFile::new(PathBuf::from("/nonexistent/track.csv"), fast());
        let (tx, _rx) = mpsc::channel(1);
        assert!(src.run(tx).await.is_err());
    }

    #[tokio::test]
    async fn test_line_source() {
        let input: &[u8] = b"9.9281,-84.0907\n\n# comment\nnope\n9.9400, -84.0907\n";
        let src = LineSource::new("test", input, fast());
        let all = collect(src, 10).await;
        assert_eq!(2, all.len());
        assert_eq!(Coordinate::new(9.94, -84.0907), all[1]);
    }

    #[tokio::test]
    async fn test_line_source_throttled_keeps_latest() {
        let input: &[u8] = b"1.0,1.0\n2.0,2.0\n3.0,3.0\n";
        let cadence = Cadence {
            interval: Duration::ZERO,
            min_interval: Duration::from_secs(3600),
        };
        let src = LineSource::new("test", input, cadence);
        let all = collect(src, 10).await;
        assert_eq!(
            vec![Coordinate::new(1.0, 1.0), Coordinate::new(3.0, 3.0)],
            all
        );
    }

    #[tokio::test]
    async fn test_line_source_held_fix_delivered_later() {
        let (mut tx_in, rx_in) = tokio::io::duplex(256);
        let cadence = Cadence {
            interval: Duration::ZERO,
            min_interval: Duration::from_millis(100),
        };
        let mut src = LineSource::new("test", BufReader::new(rx_in), cadence);
        let (tx, mut rx) = mpsc::channel(10);
        let task = tokio::spawn(async move { src.run(tx).await });

        tx_in.write_all(b"1.0,1.0\n2.0,2.0\n").await.unwrap();

        // input is still open, the second fix must come from the timer
        //
        let wait = Duration::from_secs(5);
        let first = tokio::time::timeout(wait, rx.recv()).await.unwrap();
        let second = tokio::time::timeout(wait, rx.recv()).await.unwrap();
        assert_eq!(Some(Coordinate::new(1.0, 1.0)), first);
        assert_eq!(Some(Coordinate::new(2.0, 2.0)), second);

        drop(tx_in);
        assert!(task.await.unwrap().is_ok());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_line_source_receiver_gone() {
        let input: &[u8] = b"1.0,1.0\n2.0,2.0\n";
        let mut src = LineSource::new("test", input, fast());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(src.run(tx).await.is_ok());
    }
}
