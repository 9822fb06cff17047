//! Common logging initializer
//!

use eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_tree::HierarchicalLayer;

/// Set up the global subscriber.
///
/// The returned guard (when logging to a file) must be kept alive until exit, dropping it
/// flushes the file writer.
///
pub fn init_logging(
    name: &'static str,
    use_tree: bool,
    use_file: Option<String>,
) -> Result<Option<WorkerGuard>> {
    // Initialise logging early
    //
    // Load filters from environment
    //
    let filter = EnvFilter::from_default_env();

    // Do we want hierarchical output?
    //
    let (tree, compact) = if use_tree {
        let tree = HierarchicalLayer::new(2)
            .with_ansi(true)
            .with_span_retrace(true)
            .with_span_modes(true)
            .with_targets(true)
            .with_verbose_entry(true)
            .with_verbose_exit(true)
            .with_bracketed_fields(true);
        (Some(tree), None)
    } else {
        let compact = fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_target(false)
            .compact();
        (None, Some(compact))
    };

    // Log to file?
    //
    let (file, guard) = match use_file {
        Some(dir) => {
            // Basic append-only rolling file for all traces.
            //
            let file_appender = tracing_appender::rolling::hourly(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    // Combine filters & exporters
    //
    tracing_subscriber::registry()
        .with(filter)
        .with(tree)
        .with(compact)
        .with(file)
        .try_init()?;

    Ok(guard)
}
