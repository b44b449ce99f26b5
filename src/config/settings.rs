//! Settings loaded from an optional TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::backend::DEFAULT_READER_URL;
use crate::cli::ExistingPolicy;

/// Environment variable holding the reader proxy API key.
pub const READER_KEY_ENV: &str = "BATCH_SYNTH_READER_KEY";

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Defaults that CLI flags override.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Host running the model servers.
    pub host: String,
    /// Directory outputs are written to.
    pub output_dir: PathBuf,
    /// Language used when none is given on the command line.
    pub language: String,
    /// Reader proxy base URL for the fetch backend.
    pub reader_url: String,
    pub reader_api_key: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Pause between items.
    pub delay_ms: u64,
    pub on_existing: ExistingPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            output_dir: PathBuf::from("output"),
            language: "en".to_string(),
            reader_url: DEFAULT_READER_URL.to_string(),
            reader_api_key: None,
            timeout_secs: 120,
            delay_ms: 0,
            on_existing: ExistingPolicy::Overwrite,
        }
    }
}

impl Settings {
    /// Default settings location: `<config_dir>/batch-synth/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("batch-synth").join("config.toml"))
    }

    /// Load settings.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present, otherwise built-in defaults apply. The reader key
    /// environment variable always wins over the file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(SettingsError::NotFound(path.to_path_buf()));
                }
                Self::from_file(path)?
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        if let Ok(key) = std::env::var(READER_KEY_ENV)
            && !key.is_empty()
        {
            settings.reader_api_key = Some(key);
        }

        Ok(settings)
    }

    /// The command-line language if given, else the configured one.
    pub fn language_or(&self, cli: Option<&str>) -> String {
        cli.unwrap_or(&self.language).to_string()
    }

    /// Parse a settings file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        debug!(path = %path.display(), "loading settings");

        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
