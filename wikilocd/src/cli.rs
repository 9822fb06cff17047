//! Module describing all possible commands and sub-commands to the `wikilocd` daemon
//!

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser};

use wikilocd::NotifierKind;

/// CLI options
#[derive(Parser)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<String>,
    /// Hierarchical (tree) log output.
    #[clap(short = 'T', long)]
    pub tree: bool,
    /// Also log into hourly files in this directory.
    #[clap(short = 'L', long)]
    pub log_dir: Option<String>,
    /// Sub-commands (see below).
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

// ------

/// All sub-commands:
///
/// - `run`
/// - `related`
/// - `locations`
/// - `version`
///
#[derive(Debug, Parser, PartialEq)]
pub enum SubCommand {
    /// Watch location and send notifications
    Run(RunOpts),
    /// One-shot fetch of related articles for a place
    Related(RelatedOpts),
    /// List gazetteer locations
    Locations,
    /// List all package versions
    Version,
}

/// Options for `run`
///
#[derive(Debug, Parser, PartialEq)]
pub struct RunOpts {
    /// CSV track to replay (lat,lon), `-` or nothing reads lines from stdin.
    #[clap(short = 't', long)]
    pub track: Option<PathBuf>,
    /// Notification output, overrides the configuration.
    #[clap(short = 'F', long)]
    pub format: Option<NotifierKind>,
}

/// Options for `related`
///
#[derive(Debug, Parser, PartialEq)]
pub struct RelatedOpts {
    /// Place name, as given by the resolver.
    pub place: String,
}
