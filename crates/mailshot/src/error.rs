//! Error types for mailshot.

use crate::address::AddressError;
use crate::session::SessionState;
use crate::settings::SettingsError;
use std::io;
use std::path::PathBuf;

/// Result type alias using the mailshot [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that ends a mailshot run. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Flags are missing or inconsistent.
    #[error("{0}")]
    Usage(String),

    /// A required field is blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the blank field.
        field: &'static str,
    },

    /// A header or envelope field contains CR or LF.
    #[error("{field} must not contain CR or LF")]
    Injection {
        /// Name of the offending field.
        field: &'static str,
    },

    /// An address list could not be parsed.
    #[error("error parsing \"{list}\" list: {source}")]
    Parse {
        /// Which list failed (`from`, `to`, `cc`, `bcc`).
        list: &'static str,
        /// Underlying parse failure.
        source: AddressError,
    },

    /// The settings file could not be loaded.
    #[error("error loading settings from {}: {source}", path.display())]
    Settings {
        /// File that was read.
        path: PathBuf,
        /// Underlying failure.
        source: SettingsError,
    },

    /// The server could not be reached or refused the session.
    #[error("error connecting to {server}: {source}")]
    Connect {
        /// Server as given.
        server: String,
        /// Underlying failure.
        source: mailshot_smtp::Error,
    },

    /// STARTTLS failed.
    #[error("error starting TLS: {0}")]
    Tls(#[source] mailshot_smtp::Error),

    /// Authentication failed.
    #[error("error authenticating '{user}': {source}")]
    Auth {
        /// Username that was tried.
        user: String,
        /// Underlying failure.
        source: mailshot_smtp::Error,
    },

    /// A protocol step after connecting failed.
    #[error("error {state}: {source}")]
    Protocol {
        /// State the session was moving into.
        state: SessionState,
        /// Underlying failure.
        source: mailshot_smtp::Error,
    },

    /// The driver attempted an out-of-order session transition.
    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current state.
        from: SessionState,
        /// Requested state.
        to: SessionState,
    },

    /// Reading the message body from standard input failed.
    #[error("error reading message body: {0}")]
    Input(#[from] io::Error),
}

impl Error {
    /// Returns true if usage text should accompany the message.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::MissingField { .. })
    }

    pub(crate) fn protocol(state: SessionState) -> impl FnOnce(mailshot_smtp::Error) -> Self {
        move |source| Self::Protocol { state, source }
    }
}
