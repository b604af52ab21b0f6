//! Address list parsing.
//!
//! Lists are comma separated RFC 5322 mailboxes, e.g.
//! `Alice <alice@example.com>, "Doe, John" <john@example.com>, bob@example.com`.

use crate::encoding::encode_header_text;
use mailparse::MailAddr;
use mailshot_smtp::Address;
use std::fmt;

/// Error produced while parsing an address list.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// The list does not follow RFC 5322 address syntax.
    #[error("{0}")]
    Syntax(#[from] mailparse::MailParseError),

    /// An entry parsed, but is not usable as an SMTP envelope address.
    #[error(transparent)]
    Envelope(#[from] mailshot_smtp::Error),
}

/// A parsed mailbox: optional display name plus email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name, if one was given.
    pub name: Option<String>,
    /// Envelope address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a mailbox without a display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a valid envelope address.
    pub fn new(address: impl Into<String>) -> Result<Self, AddressError> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a mailbox with a display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a valid envelope address.
    pub fn with_name(
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, AddressError> {
        let name = name.into();
        Ok(Self {
            name: (!name.trim().is_empty()).then_some(name),
            address: Address::new(address)?,
        })
    }

    /// Returns the bare email address.
    #[must_use]
    pub fn email(&self) -> &str {
        self.address.as_str()
    }
}

/// Header form: `email`, `Name <email>`, `"Quoted, Name" <email>`, or an
/// encoded word in place of a non-ASCII name.
impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(name) = &self.name else {
            return f.write_str(self.address.as_str());
        };

        if !name.is_ascii() {
            write!(f, "{} <{}>", encode_header_text(name), self.address)
        } else if name.split(' ').all(is_atom) {
            write!(f, "{name} <{}>", self.address)
        } else {
            f.write_str("\"")?;
            for ch in name.chars() {
                if ch == '"' || ch == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{ch}")?;
            }
            write!(f, "\" <{}>", self.address)
        }
    }
}

/// RFC 5322 `atom`: one or more `atext` characters.
fn is_atom(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c))
}

/// Parses a comma separated address list, preserving order.
///
/// The empty string yields an empty list. Group syntax contributes its
/// members. Any invalid entry fails the whole list.
///
/// # Errors
///
/// Returns an error if the list is syntactically invalid or an entry is not
/// a usable envelope address.
pub fn parse_address_list(raw: &str) -> Result<Vec<Mailbox>, AddressError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let parsed = mailparse::addrparse(raw)?;
    let mut mailboxes = Vec::with_capacity(parsed.len());

    for entry in parsed.iter() {
        match entry {
            MailAddr::Single(info) => mailboxes.push(mailbox(info)?),
            MailAddr::Group(group) => {
                for info in &group.addrs {
                    mailboxes.push(mailbox(info)?);
                }
            }
        }
    }

    Ok(mailboxes)
}

fn mailbox(info: &mailparse::SingleInfo) -> Result<Mailbox, AddressError> {
    match &info.display_name {
        Some(name) => Mailbox::with_name(name.trim(), info.addr.as_str()),
        None => Mailbox::new(info.addr.as_str()),
    }
}
