//! Optional settings file with per-user defaults.
//!
//! Stored as JSON at `<config dir>/mailshot/settings.json`:
//!
//! ```json
//! {
//!   "server": "smtp.example.com:587",
//!   "from": "Alice <alice@example.com>",
//!   "username": "alice@example.com",
//!   "starttls": true,
//!   "auth": true,
//!   "helo_name": "laptop.example.com"
//! }
//! ```
//!
//! Every key is optional. Flags always take precedence.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Error reading or decoding a settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The file is not valid settings JSON.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Defaults loaded from the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// SMTP server `host:port`.
    pub server: Option<String>,
    /// From address.
    pub from: Option<String>,
    /// Authentication username, used when neither flag nor environment set one.
    pub username: Option<String>,
    /// Whether to use STARTTLS when offered.
    pub starttls: Option<bool>,
    /// Whether to authenticate when offered.
    pub auth: Option<bool>,
    /// Name announced in EHLO.
    pub helo_name: Option<String>,
}

impl Settings {
    /// Default settings location, if the platform has a config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mailshot").join("settings.json"))
    }

    /// Loads settings from `explicit`, or from [`default_path`](Self::default_path).
    ///
    /// A missing file at the default location yields empty settings; an
    /// explicit path must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path).map_err(|source| Error::Settings {
                path: path.to_path_buf(),
                source,
            });
        }

        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };

        match Self::from_file(&path) {
            Ok(settings) => Ok(settings),
            Err(SettingsError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file");
                Ok(Self::default())
            }
            Err(source) => Err(Error::Settings { path, source }),
        }
    }

    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> std::result::Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&text)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parses settings from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid settings JSON.
    pub fn from_json(text: &str) -> std::result::Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }
}
