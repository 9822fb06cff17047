//! This is the `ConfigFile` struct.
//!
//! This is for finding the right default locations for various configuration files for
//! `wikiloc`.  This is a configuration file/struct neutral loading engine, storing only the
//! base directory and with `load()` read the proper file, the default one or the built-in
//! one compiled into the binary.
//!
//! This encapsulates the configuration file, available with `.inner()` or `.inner_mut()`.
//!

use std::env;
use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use eyre::Result;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, trace};

use crate::makepath;

/// Main name for the directory base
const TAG: &str = "wikiloc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Bad config file version v{0}, need v{1}")]
    BadVersion(usize, usize),
    #[error("Unknown config file {0}")]
    UnknownFile(String),
}

/// Anything that can be loaded through `ConfigFile`.
///
pub trait IntoConfig: Debug + DeserializeOwned {
    /// Version the code understands
    const VERSION: usize;
    /// Filename inside the configuration directory
    const FILENAME: &'static str;

    /// Version found in the file
    fn version(&self) -> usize;
    /// Configuration used when there is no file at all
    fn builtin() -> &'static str;
}

#[derive(Debug)]
pub struct ConfigFile<T: IntoConfig> {
    /// Tag is the project name.
    tag: String,
    /// This is the base directory for all files.
    basedir: PathBuf,
    /// Where did we load it from, `None` for the built-in one
    source: Option<PathBuf>,
    inner: T,
}

/// Returns the path of the default config directory for `tag`
///
#[tracing::instrument]
pub fn config_dir(tag: &str) -> PathBuf {
    match BaseDirs::new() {
        Some(base) => {
            #[cfg(unix)]
            let base = base.home_dir().join(".config");

            #[cfg(windows)]
            let base = base.data_local_dir().to_path_buf();

            debug!("base = {base:?}");
            makepath!(base, tag)
        }
        None => {
            #[cfg(unix)]
            let homedir = env::var("HOME").unwrap_or_else(|_| String::from("."));

            #[cfg(windows)]
            let homedir = env::var("LOCALAPPDATA").unwrap_or_else(|_| String::from("."));

            debug!("base = {homedir}");

            #[cfg(unix)]
            let base = makepath!(homedir, ".config", tag);

            #[cfg(windows)]
            let base = makepath!(homedir, tag);

            base
        }
    }
}

impl<T> ConfigFile<T>
where
    T: IntoConfig,
{
    /// Returns the path of the default config directory
    ///
    pub fn config_path(&self) -> PathBuf {
        self.basedir.clone()
    }

    /// Returns the path of the default config file
    ///
    pub fn default_file() -> PathBuf {
        config_dir(TAG).join(T::FILENAME)
    }

    /// Project name
    ///
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// File we read, if any
    ///
    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Load the file and return a struct T in the right format.
    ///
    /// Use the following search path:
    /// - file specified on CLI (must exist)
    /// - default basedir (base on $HOME or $LOCALAPPDATA)
    /// - built-in configuration
    ///
    #[tracing::instrument]
    pub fn load(fname: Option<&str>) -> Result<ConfigFile<T>> {
        let basedir = config_dir(TAG);

        let source = match fname {
            Some(fname) => {
                let fname = PathBuf::from(fname);
                if !fname.exists() {
                    return Err(ConfigError::UnknownFile(fname.to_string_lossy().to_string()).into());
                }
                Some(fname.canonicalize()?)
            }
            None => {
                let def = Self::default_file();
                if def.exists() {
                    Some(def)
                } else {
                    None
                }
            }
        };

        let data = match &source {
            Some(fname) => {
                trace!("Loading config file {fname:?} from {basedir:?}");
                fs::read_to_string(fname)?
            }
            None => {
                trace!("Using built-in config");
                T::builtin().to_owned()
            }
        };
        debug!("string data = {data}");

        let inner = Self::from_str(&data)?;
        Ok(ConfigFile {
            tag: String::from(TAG),
            basedir,
            source,
            inner,
        })
    }

    /// Parse and check version.
    ///
    pub fn from_str(data: &str) -> Result<T> {
        let inner: T = hcl::from_str(data)?;
        debug!("struct data = {inner:?}");

        if inner.version() != T::VERSION {
            return Err(ConfigError::BadVersion(inner.version(), T::VERSION).into());
        }
        Ok(inner)
    }

    /// Return the inner configuration file
    ///
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Return the inner configuration file as putable
    ///
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}
