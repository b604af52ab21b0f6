//! SMTP connection management with type-state pattern.

mod client;
mod data;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, DataWriter, MailTransaction, RecipientAdded,
    Rejected, SmtpConnection, Transition,
};
pub use stream::{SmtpStream, connect};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks for an extension by EHLO keyword, ignoring case and parameters.
    #[must_use]
    pub fn supports_extension(&self, keyword: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.keyword().eq_ignore_ascii_case(keyword))
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the advertised authentication mechanisms, or `None` if the
    /// server did not advertise AUTH at all.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Option<&[AuthMechanism]> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Auth(mechanisms) => Some(mechanisms.as_slice()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "mx.example.com".into(),
            extensions: lines.iter().filter_map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn supports_extension_by_keyword() {
        let info = info(&["STARTTLS", "AUTH LOGIN PLAIN", "SIZE 1000", "X-CUSTOM"]);
        assert!(info.supports_extension("auth"));
        assert!(info.supports_extension("STARTTLS"));
        assert!(info.supports_extension("size"));
        assert!(info.supports_extension("x-custom"));
        assert!(!info.supports_extension("PIPELINING"));
        assert!(info.supports_starttls());
    }

    #[test]
    fn auth_mechanisms_absent_vs_empty() {
        assert_eq!(info(&["STARTTLS"]).auth_mechanisms(), None);
        assert_eq!(info(&["AUTH"]).auth_mechanisms(), Some(&[][..]));
        assert_eq!(
            info(&["AUTH PLAIN"]).auth_mechanisms(),
            Some(&[AuthMechanism::Plain][..])
        );
    }
}
