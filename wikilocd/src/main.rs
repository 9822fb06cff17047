//! This is the `wikilocd` daemon launcher
//!
//! It watches coordinates coming from a track file or stdin, and for every significant move
//! tells the user where they are and which Wikipedia articles are related to the place.
//!

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use wikiloc_common::{init_logging, list_locations, load_locations, ConfigFile};
use wikiloc_sources::{Geolocator, LineSource, Related, TrackFile};
use wikilocd::{Service, Settings, SignificanceFilter};

use crate::cli::{Opts, RelatedOpts, RunOpts, SubCommand};

mod cli;

/// Daemon name
const NAME: &str = env!("CARGO_BIN_NAME");

/// Daemon version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Room for coordinates waiting to be evaluated
const QUEUE: usize = 16;

/// How long blocking reads (stdin) may hold the runtime once we are done
const LINGER: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let opts = Opts::parse();

    // Initialise logging early
    //
    let _guard = init_logging(NAME, opts.tree, opts.log_dir.clone())?;
    trace!("Logging initialised.");

    let cfg = ConfigFile::<Settings>::load(opts.config.as_deref())?;
    match cfg.source() {
        Some(fname) => info!("Using {fname:?}"),
        None => info!("Using built-in configuration"),
    }
    let cfg = cfg.inner();
    cfg.check()?;

    // A read on stdin can not be cancelled, do not wait for it forever on exit.
    //
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let res = rt.block_on(execute(cfg, opts.subcmd));
    rt.shutdown_timeout(LINGER);
    res
}

async fn execute(cfg: &Settings, subcmd: SubCommand) -> Result<()> {
    trace!("Execute commands.");
    match subcmd {
        SubCommand::Run(ropts) => run(cfg, ropts).await?,
        SubCommand::Related(ropts) => related(cfg, ropts).await?,
        SubCommand::Locations => {
            let data = load_locations(cfg.locations.clone())?;
            println!("{}", list_locations(&data, cfg.radius)?);
        }
        SubCommand::Version => {
            println!("{} v{}", NAME, VERSION);
            println!("{}", wikiloc_common::version());
            println!("{}", wikiloc_sources::version());
        }
    }
    Ok(())
}

/// Pick the geolocation source.
///
fn source(cfg: &Settings, track: Option<&Path>) -> Box<dyn Geolocator> {
    match track {
        Some(path) if path != Path::new("-") => {
            Box::new(TrackFile::new(path.to_path_buf(), cfg.cadence()))
        }
        _ => Box::new(LineSource::stdin(cfg.cadence())),
    }
}

/// Main loop: source task -> channel -> service, until the source is exhausted or Ctrl-C.
///
#[tracing::instrument(skip(cfg))]
async fn run(cfg: &Settings, opts: RunOpts) -> Result<()> {
    let resolver = cfg.resolver()?;
    let related: Arc<dyn Related> = Arc::new(cfg.related()?);
    let notifier = cfg.notifier(opts.format);

    let service = Service::new(
        SignificanceFilter::new(cfg.threshold),
        resolver,
        related,
        notifier,
        cfg.workers,
        cfg.grace(),
    );

    let mut src = source(cfg, opts.track.as_deref());
    info!("Reading coordinates from {}", src.name());

    let (tx, rx) = mpsc::channel(QUEUE);
    let feeder = tokio::spawn(async move { src.run(tx).await });

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("can not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let stats = service.run(rx, stop).await;

    // stdin may still be blocked on a read
    //
    feeder.abort();
    match feeder.await {
        Ok(Err(e)) => warn!("location source: {e}"),
        Ok(Ok(())) | Err(_) => (),
    }

    info!("{stats}");
    Ok(())
}

/// One-shot fetch, errors are reported this time.
///
#[tracing::instrument(skip(cfg))]
async fn related(cfg: &Settings, opts: RelatedOpts) -> Result<()> {
    let site = cfg.related()?;
    let pages = site.related(&opts.place).await?;

    if pages.is_empty() {
        println!("Nothing related to {}.", opts.place);
    }
    for page in pages {
        println!("{}\t{}", page.title, page.url());
    }
    Ok(())
}
