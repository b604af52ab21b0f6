//! SMTP command builder.

use crate::types::{Address, AuthMechanism};
use std::fmt;

/// SMTP command issued by the client.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting, used when EHLO is refused
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (SASL-IR), already base64 encoded
        initial_response: Option<String>,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to bytes, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = match self {
            Self::Helo { hostname } => format!("HELO {hostname}"),
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(resp),
            } => format!("AUTH {} {resp}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {}", mechanism.as_str()),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
        .into_bytes();

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

// Used for tracing; never shows the AUTH initial response.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Helo { hostname } => write!(f, "HELO {hostname}"),
            Self::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth { mechanism, .. } => write!(f, "AUTH {} <redacted>", mechanism.as_str()),
            Self::MailFrom { from } => write!(f, "MAIL FROM:<{from}>"),
            Self::RcptTo { to } => write!(f, "RCPT TO:<{to}>"),
            Self::Data => f.write_str("DATA"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}
