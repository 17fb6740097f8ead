//! Run configuration.
//!
//! Settings come from two places: an optional TOML file carrying defaults
//! (including the default rule list), and the command line, which overrides
//! scalar values and appends its rules after the file's. The merged result is
//! an immutable [`Settings`] built once at startup.
//!
//! # Configuration File Format
//!
//! ```toml
//! destination = "/shares/files"
//! source = "/shares/upload"
//! glob = "**/*"
//! parallel = 4
//! stop_unmatched = true
//! rules = [
//!     's!^(?<base>.+)\.jpg$!images/${base}.jpg!',
//! ]
//! ```

use crate::executor::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of operations allowed in flight.
pub const DEFAULT_PARALLEL: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

/// Default glob expression: everything directly inside the source root.
pub const DEFAULT_GLOB: &str = "*";

const LOCAL_CONFIG: &str = ".rulemove.toml";

/// Errors that can occur while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration in {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    /// IO error while reading configuration.
    #[error("error reading configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No destination root from either the command line or the config file.
    #[error("a destination must be specified with --to")]
    MissingDestination,
    #[error("unable to determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Defaults read from a TOML configuration file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub destination: Option<PathBuf>,
    #[serde(default)]
    pub glob: Option<String>,
    #[serde(default)]
    pub parallel: Option<NonZeroUsize>,
    #[serde(default)]
    pub stop_unmatched: Option<bool>,
    /// Rules applied before any given on the command line.
    #[serde(default)]
    pub rules: Vec<String>,
}

impl FileConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.rulemove.toml` in the current directory
    /// 3. Look for `~/.config/rulemove/config.toml` in home directory
    /// 4. Fall back to an empty configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is malformed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("rulemove")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|reason| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub glob: Option<String>,
    pub rules: Vec<String>,
    pub parallel: Option<NonZeroUsize>,
    pub dry_run: bool,
    pub debug: bool,
    pub stop_unmatched: bool,
    pub verbosity: u8,
}

/// Immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory candidates are listed from and moved out of.
    pub source_root: PathBuf,
    /// Directory destination templates are joined onto.
    pub destination_root: PathBuf,
    pub glob: String,
    /// Rule strings in priority order.
    pub rules: Vec<String>,
    pub concurrency: NonZeroUsize,
    pub mode: ExecutionMode,
    pub stop_on_unmatched: bool,
    pub verbosity: u8,
}

impl Settings {
    /// Merges file defaults with command-line overrides.
    ///
    /// `--debug` forces a concurrency of one and dry-run mode. A missing
    /// source root defaults to the current directory.
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self, ConfigError> {
        let destination_root = cli
            .destination
            .or(file.destination)
            .ok_or(ConfigError::MissingDestination)?;

        let source_root = match cli.source.or(file.source) {
            Some(source) => source,
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };

        let mut rules = file.rules;
        rules.extend(cli.rules);

        let (concurrency, mode) = if cli.debug {
            (NonZeroUsize::MIN, ExecutionMode::DryRun)
        } else {
            let concurrency = cli.parallel.or(file.parallel).unwrap_or(DEFAULT_PARALLEL);
            let mode = if cli.dry_run {
                ExecutionMode::DryRun
            } else {
                ExecutionMode::Live
            };
            (concurrency, mode)
        };

        Ok(Self {
            source_root,
            destination_root,
            glob: cli
                .glob
                .or(file.glob)
                .unwrap_or_else(|| DEFAULT_GLOB.to_string()),
            rules,
            concurrency,
            mode,
            stop_on_unmatched: cli.stop_unmatched || file.stop_unmatched.unwrap_or(false),
            verbosity: cli.verbosity,
        })
    }

    /// Default log filter for the configured verbosity; `RUST_LOG` overrides it.
    pub fn log_level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
