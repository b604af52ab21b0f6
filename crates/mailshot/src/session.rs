//! Drives one SMTP session from connect to QUIT.
//!
//! The session moves through [`SessionState`] strictly forward:
//!
//! ```text
//! Unconnected → Connected → (Secured)? → (Authenticated)? → SenderSet
//!             → RecipientsSet → DataWritten → Closed
//! ```
//!
//! Any failure ends the run. Once connected, a failure in command mode is
//! followed by a best-effort `QUIT`; a failure while the message content is
//! being written drops the connection, which aborts the transaction.

use crate::compose::{Message, envelope_recipients};
use crate::config::Config;
use crate::error::{Error, Result};
use mailshot_smtp::{
    Address, Authenticated, Client, Connected, DataWriter, MailTransaction, SmtpConnection,
    Transition,
};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// Chunk size used when streaming the body from standard input.
const BODY_CHUNK: usize = 8 * 1024;

/// Driver-level session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// No connection yet.
    Unconnected,
    /// Greeting and EHLO done.
    Connected,
    /// STARTTLS completed.
    Secured,
    /// AUTH completed.
    Authenticated,
    /// MAIL FROM accepted.
    SenderSet,
    /// Every RCPT TO accepted.
    RecipientsSet,
    /// Message content accepted.
    DataWritten,
    /// QUIT sent.
    Closed,
}

impl SessionState {
    const ORDER: [Self; 8] = [
        Self::Unconnected,
        Self::Connected,
        Self::Secured,
        Self::Authenticated,
        Self::SenderSet,
        Self::RecipientsSet,
        Self::DataWritten,
        Self::Closed,
    ];

    /// States the session may pass over.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Secured | Self::Authenticated)
    }

    /// Returns true if the session may move from `self` straight to `next`:
    /// forward only, skipping nothing but optional states.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        next > self
            && Self::ORDER
                .iter()
                .filter(|state| **state > self && **state < next)
                .all(|state| state.is_optional())
    }
}

/// Describes the step that leads into the state, for error messages.
impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconnected => "before connecting",
            Self::Connected => "connecting",
            Self::Secured => "starting TLS",
            Self::Authenticated => "authenticating",
            Self::SenderSet => "specifying mail from",
            Self::RecipientsSet => "specifying recipient",
            Self::DataWritten => "outputting data",
            Self::Closed => "during quit",
        })
    }
}

/// Tracks the current [`SessionState`] and enforces forward transitions.
#[derive(Debug)]
struct Progress {
    state: SessionState,
}

impl Progress {
    const fn new() -> Self {
        Self {
            state: SessionState::Unconnected,
        }
    }

    fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
        Ok(())
    }
}

/// Non-fatal conditions reported during a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// Credentials were supplied but the server does not offer AUTH.
    CredentialsUnused,
    /// The server offers AUTH but no credentials were supplied.
    NoCredentials,
    /// STARTTLS was requested but the server does not offer it.
    TlsUnavailable,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CredentialsUnused => {
                "credentials supplied but server does not support authentication"
            }
            Self::NoCredentials => {
                "server supports authentication but no credentials were supplied; sending without"
            }
            Self::TlsUnavailable => "server does not support STARTTLS; sending unencrypted",
        })
    }
}

/// Summary of a completed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Envelope recipients, in the order RCPT TO was issued.
    pub recipients: Vec<Address>,
    /// Whether the session was upgraded with STARTTLS.
    pub tls: bool,
    /// Whether AUTH succeeded.
    pub authenticated: bool,
    /// Body bytes handed to the server, before transparency encoding.
    pub body_bytes: u64,
    /// Non-fatal conditions met on the way.
    pub warnings: Vec<Warning>,
}

/// Client ready for MAIL FROM, with or without authentication.
enum Ready {
    Anonymous(Client<Connected>),
    Authenticated(Client<Authenticated>),
}

impl Ready {
    async fn mail_from(self, from: &Address) -> mailshot_smtp::Result<Client<MailTransaction>> {
        match self {
            Self::Anonymous(client) => settle(client.mail_from(from).await).await,
            Self::Authenticated(client) => settle(client.mail_from(from).await).await,
        }
    }
}

/// Sends `QUIT` on a rejected transition before surfacing its error.
async fn settle<T, S>(result: Transition<T, S>) -> mailshot_smtp::Result<T> {
    match result {
        Ok(next) => Ok(next),
        Err(rejected) => Err(rejected.quit().await),
    }
}

fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    warn!("{warning}");
    warnings.push(warning);
}

/// Sends the message described by `config`.
///
/// When `config.message` is `None` the body is read from `body` until end of
/// input.
///
/// # Errors
///
/// Returns the first failure; nothing is retried.
pub async fn deliver<R>(config: &Config, body: R) -> Result<Delivery>
where
    R: AsyncRead + Unpin,
{
    let recipients = envelope_recipients(&config.to, &config.cc, &config.bcc);
    if recipients.is_empty() {
        return Err(Error::Usage(
            "at least one recipient (to, cc or bcc) is required".into(),
        ));
    }
    let message = Message::new(&config.from, &config.to, &config.cc, &config.subject);

    let mut progress = Progress::new();
    let mut warnings = Vec::new();

    let client = Client::connect(&config.server, &config.helo_name)
        .await
        .map_err(|source| Error::Connect {
            server: config.server.to_string(),
            source,
        })?;
    progress.advance(SessionState::Connected)?;

    let client = if !config.starttls {
        client
    } else if client.supports_extension("STARTTLS") {
        let client = settle(client.starttls(&config.server.host, &config.helo_name).await)
            .await
            .map_err(Error::Tls)?;
        progress.advance(SessionState::Secured)?;
        client
    } else {
        record(&mut warnings, Warning::TlsUnavailable);
        client
    };
    let tls = client.is_tls();

    let offers_auth = client.supports_extension("AUTH");
    let credentials = &config.credentials;
    let ready = if !config.auth {
        debug!("authentication disabled");
        Ready::Anonymous(client)
    } else if offers_auth && credentials.is_supplied() {
        let client = settle(
            client
                .auth_plain(&credentials.username, &credentials.password, &config.server.host)
                .await,
        )
        .await
        .map_err(|source| Error::Auth {
            user: credentials.username.clone(),
            source,
        })?;
        progress.advance(SessionState::Authenticated)?;
        Ready::Authenticated(client)
    } else {
        if offers_auth {
            record(&mut warnings, Warning::NoCredentials);
        } else if credentials.is_supplied() {
            record(&mut warnings, Warning::CredentialsUnused);
        }
        Ready::Anonymous(client)
    };
    let authenticated = matches!(ready, Ready::Authenticated(_));

    let client = ready
        .mail_from(&config.from.address)
        .await
        .map_err(Error::protocol(SessionState::SenderSet))?;
    progress.advance(SessionState::SenderSet)?;

    let (first, rest) = recipients
        .split_first()
        .ok_or_else(|| Error::Usage("no recipients".into()))?;
    let mut client = settle(client.rcpt_to(first).await)
        .await
        .map_err(Error::protocol(SessionState::RecipientsSet))?;
    for recipient in rest {
        client = settle(client.rcpt_to(recipient).await)
            .await
            .map_err(Error::protocol(SessionState::RecipientsSet))?;
    }
    progress.advance(SessionState::RecipientsSet)?;

    let mut data = settle(client.data().await)
        .await
        .map_err(Error::protocol(SessionState::DataWritten))?;
    data.write(&message.header_block())
        .await
        .map_err(Error::protocol(SessionState::DataWritten))?;
    let body_bytes = match &config.message {
        Some(text) => {
            data.write(text.as_bytes())
                .await
                .map_err(Error::protocol(SessionState::DataWritten))?;
            text.len() as u64
        }
        None => stream_body(&mut data, body).await?,
    };
    let client = settle(data.finish().await)
        .await
        .map_err(Error::protocol(SessionState::DataWritten))?;
    progress.advance(SessionState::DataWritten)?;
    info!(recipients = recipients.len(), body_bytes, "message accepted");

    // The message is already accepted; a failed QUIT does not undo that.
    if let Err(err) = client.quit().await {
        warn!("error during quit: {err}");
    }
    progress.advance(SessionState::Closed)?;

    Ok(Delivery {
        recipients,
        tls,
        authenticated,
        body_bytes,
        warnings,
    })
}

/// Copies `body` into the DATA writer until end of input.
async fn stream_body<R>(data: &mut DataWriter, mut body: R) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; BODY_CHUNK];
    let mut total = 0u64;
    loop {
        let read = body.read(&mut buf).await?;
        if read == 0 {
            return Ok(total);
        }
        data.write(&buf[..read])
            .await
            .map_err(Error::protocol(SessionState::DataWritten))?;
        total += read as u64;
    }
}
