//! SMTP extension types.

/// SMTP service extension advertised in an EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication, with every advertised mechanism
    Auth(Vec<AuthMechanism>),
    /// Any other extension, keyword upper-cased
    Other(String),
}

impl Extension {
    /// Parses an extension line from EHLO response.
    ///
    /// Returns `None` for a blank line.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let keyword = parts.next()?.to_ascii_uppercase();

        let ext = match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.map(AuthMechanism::parse).collect()),
            _ => Self::Other(keyword),
        };
        Some(ext)
    }

    /// Returns the EHLO keyword of this extension.
    #[must_use]
    pub fn keyword(&self) -> &str {
        match self {
            Self::StartTls => "STARTTLS",
            Self::Auth(_) => "AUTH",
            Self::Other(keyword) => keyword,
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// Any other mechanism, name upper-cased
    Other(String),
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let name = s.to_ascii_uppercase();
        if name == "PLAIN" {
            Self::Plain
        } else {
            Self::Other(name)
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain => "PLAIN",
            Self::Other(name) => name,
        }
    }
}
