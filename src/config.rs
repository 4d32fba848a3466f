use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;

pub const DEFAULT_REMOTE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration '{value}': {source}")]
    Duration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("could not determine data directory")]
    DataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            base_url: DEFAULT_REMOTE_URL.to_string(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub remote: RemoteConfig,
    pub verbose: bool,
}

/// On-disk shape of config.toml. Every key is optional.
///
/// ```toml
/// db_path = "/home/me/scans.db"
///
/// [remote]
/// base_url = "http://192.168.1.20:3000"
/// timeout = "5s"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub remote: RemoteSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl ConfigFile {
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }
}

/// ~/.config/scanqr/config.toml or platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "scanqr")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// File values first, then command line overrides.
    ///
    /// An explicit `--config` must exist; the default location is optional.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => ConfigFile::read(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => ConfigFile::read(&path)?,
                _ => ConfigFile::default(),
            },
        };

        let mut config = Config::from_file(file)?;

        if let Some(db) = &cli.db {
            config.db_path = db.clone();
        }
        if let Some(url) = &cli.remote_url {
            config.remote.base_url = url.clone();
        }
        config.verbose = cli.verbose;

        Ok(config)
    }

    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let db_path = match file.db_path {
            Some(path) => path,
            None => crate::store::default_db_path().map_err(|_| ConfigError::DataDir)?,
        };

        let timeout = match file.remote.timeout {
            Some(value) => humantime::parse_duration(&value)
                .map_err(|source| ConfigError::Duration { value, source })?,
            None => DEFAULT_REMOTE_TIMEOUT,
        };

        Ok(Config {
            db_path,
            remote: RemoteConfig {
                base_url: file
                    .remote
                    .base_url
                    .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string()),
                timeout,
            },
            verbose: false,
        })
    }
}
