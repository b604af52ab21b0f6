//! Envelope and server address types.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope (`MAIL FROM` / `RCPT TO`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part (after the `@`).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Validates an envelope address.
    ///
    /// Anything that would break the `<...>` framing of an SMTP command line
    /// is rejected along with the obvious structural problems.
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
        {
            return Err(Error::InvalidAddress(format!(
                "'{addr}' contains characters not allowed in an envelope address"
            )));
        }

        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress(format!("'{addr}' must contain @")));
        };

        if domain.contains('@') {
            return Err(Error::InvalidAddress(format!(
                "'{addr}' must have exactly one @"
            )));
        }

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "'{addr}': local and domain parts cannot be empty"
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SMTP server endpoint parsed from `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// Host name or IP literal, without IPv6 brackets.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ServerAddress {
    /// Parses `host:port` or `[v6-literal]:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidServer`] if the host or the port is missing or
    /// the port is not a number in `1..=65535`.
    pub fn parse(server: &str) -> Result<Self> {
        let invalid = || Error::InvalidServer(server.to_string());

        let (host, port) = server.rsplit_once(':').ok_or_else(invalid)?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(invalid)?,
            None if host.contains(':') => return Err(invalid()),
            None => host,
        };

        let port: u16 = port.parse().map_err(|_| invalid())?;
        if host.is_empty() || port == 0 {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Returns true if the host is a loopback name or address.
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        is_loopback_host(&self.host)
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

pub(crate) fn is_loopback_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}
