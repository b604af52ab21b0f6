//! Message composition: header block and envelope recipients.

use crate::address::Mailbox;
use crate::encoding::encode_header_text;
use mailshot_smtp::Address;
use std::collections::HashSet;

const CRLF: &str = "\r\n";

/// Message headers in the order they are written.
///
/// From, one To per recipient, one CC per recipient, then Subject when it is
/// not empty. BCC recipients never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Vec<(&'static str, String)>,
}

impl Message {
    /// Builds the header list.
    #[must_use]
    pub fn new(from: &Mailbox, to: &[Mailbox], cc: &[Mailbox], subject: &str) -> Self {
        let mut headers = Vec::with_capacity(2 + to.len() + cc.len());
        headers.push(("From", from.to_string()));
        headers.extend(to.iter().map(|m| ("To", m.to_string())));
        headers.extend(cc.iter().map(|m| ("CC", m.to_string())));
        if !subject.is_empty() {
            headers.push(("Subject", encode_header_text(subject).into_owned()));
        }
        Self { headers }
    }

    /// Iterates over `(name, value)` pairs in order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(name, value)| (*name, value.as_str()))
    }

    /// Serializes the headers, each terminated by CRLF, followed by the blank
    /// line that separates them from the body.
    #[must_use]
    pub fn header_block(&self) -> Vec<u8> {
        let mut block = String::new();
        for (name, value) in self.headers() {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str(CRLF);
        }
        block.push_str(CRLF);
        block.into_bytes()
    }
}

/// Envelope recipients: To, then CC, then BCC, in input order.
///
/// An address listed more than once (ignoring case) is only sent once.
#[must_use]
pub fn envelope_recipients(to: &[Mailbox], cc: &[Mailbox], bcc: &[Mailbox]) -> Vec<Address> {
    let mut seen = HashSet::new();
    to.iter()
        .chain(cc)
        .chain(bcc)
        .filter(|m| seen.insert(m.email().to_ascii_lowercase()))
        .map(|m| m.address.clone())
        .collect()
}
