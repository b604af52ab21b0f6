//! Type-state SMTP client.

use super::data::DotStuffer;
use super::{ServerInfo, SmtpStream, stream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{
    Address, AuthMechanism, Extension, Reply, ReplyCode, ServerAddress, is_loopback_host,
};
use base64::Engine;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;

    /// Checks if the server advertised the extension with this EHLO keyword.
    fn supports_extension(&self, keyword: &str) -> bool {
        self.server_info().supports_extension(keyword)
    }
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

/// A failed state transition.
///
/// Carries the error and, when the connection is still in command mode, the
/// client in the state it was in before the attempt so the caller can still
/// end the session with `QUIT`.
pub struct Rejected<S> {
    error: Error,
    client: Option<Client<S>>,
}

/// Result of a state transition on [`Client`].
pub type Transition<T, S> = std::result::Result<T, Rejected<S>>;

impl<S> Rejected<S> {
    fn new(error: Error, client: Client<S>) -> Self {
        // After an I/O failure the stream is in an unknown state.
        let usable = !matches!(
            error,
            Error::Io(_) | Error::Tls(_) | Error::ConnectionClosed | Error::Protocol(_)
        );
        Self {
            error,
            client: usable.then_some(client),
        }
    }

    const fn lost(error: Error) -> Self {
        Self {
            error,
            client: None,
        }
    }

    /// Returns the error that caused the rejection.
    #[must_use]
    pub const fn error(&self) -> &Error {
        &self.error
    }

    /// Returns true if the connection can still be closed with `QUIT`.
    #[must_use]
    pub const fn can_quit(&self) -> bool {
        self.client.is_some()
    }

    /// Drops the connection without `QUIT` and returns the error.
    #[must_use]
    pub fn into_error(self) -> Error {
        self.error
    }

    /// Sends `QUIT` if the connection is still usable, then returns the
    /// error that caused the rejection. Failures while quitting are only logged.
    pub async fn quit(self) -> Error {
        if let Some(client) = self.client
            && let Err(err) = client.quit().await
        {
            debug!(error = %err, "QUIT after failure did not complete");
        }
        self.error
    }
}

impl<S> fmt::Debug for Rejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .field("can_quit", &self.can_quit())
            .finish()
    }
}

impl<S> fmt::Display for Rejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<S> From<Rejected<S>> for Error {
    fn from(rejected: Rejected<S>) -> Self {
        rejected.error
    }
}

impl Client<Connected> {
    /// Connects to `server`, reads the greeting and introduces itself as
    /// `client_hostname`.
    ///
    /// If the greeting or the EHLO/HELO exchange is refused, `QUIT` is sent
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection, the greeting or the EHLO/HELO
    /// exchange fails.
    pub async fn connect(server: &ServerAddress, client_hostname: &str) -> Result<Self> {
        debug!(%server, "connecting");
        let stream = stream::connect(server).await?;
        let client = match Self::from_stream(stream).await {
            Ok(client) => client,
            Err(rejected) => return Err(rejected.quit().await),
        };
        match client.ehlo(client_hostname).await {
            Ok(client) => Ok(client),
            Err(rejected) => Err(rejected.quit().await),
        }
    }

    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns a rejection if reading the greeting fails or the server is
    /// not ready (anything but 220).
    pub async fn from_stream(stream: SmtpStream) -> Transition<Self, Connected> {
        let mut client = Self {
            stream,
            server_info: ServerInfo {
                hostname: String::from("unknown"),
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        };

        let greeting = match Self::read_reply(&mut client.stream).await {
            Ok(reply) => reply.expect_code(ReplyCode::SERVICE_READY),
            Err(error) => Err(error),
        };
        let greeting = match greeting {
            Ok(greeting) => greeting,
            Err(error) => return Err(Rejected::new(error, client)),
        };

        if let Some(hostname) = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
        {
            client.server_info.hostname = hostname.to_string();
        }
        debug!(hostname = %client.server_info.hostname, "server greeting received");
        Ok(client)
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// Falls back to HELO (no extensions) when the server rejects EHLO.
    ///
    /// # Errors
    ///
    /// Returns a rejection if both EHLO and HELO fail.
    pub async fn ehlo(mut self, client_hostname: &str) -> Transition<Self, Connected> {
        match self.hello(client_hostname).await {
            Ok(()) => Ok(self),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }

    async fn hello(&mut self, client_hostname: &str) -> Result<()> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if reply.is_success() {
            // First line is the greeting, the rest are extensions.
            self.server_info.extensions = reply
                .message
                .iter()
                .skip(1)
                .filter_map(|line| Extension::parse(line))
                .collect();
            return Ok(());
        }

        debug!(code = %reply.code, "EHLO rejected, falling back to HELO");
        self.send_command(Command::Helo {
            hostname: client_hostname.to_string(),
        })
        .await?
        .expect_success()?;
        self.server_info.extensions.clear();
        Ok(())
    }

    /// Upgrades the connection to TLS using STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns a rejection if STARTTLS is not advertised, the server refuses
    /// it, or the TLS handshake fails.
    pub async fn starttls(mut self, hostname: &str, client_hostname: &str) -> Transition<Self, Connected> {
        if !self.server_info.supports_starttls() {
            return Err(Rejected::new(Error::NotSupported("STARTTLS".into()), self));
        }

        if let Err(error) = self.execute(Command::StartTls).await {
            return Err(Rejected::new(error, self));
        }

        self.stream = match self.stream.upgrade_to_tls(hostname).await {
            Ok(stream) => stream,
            Err(error) => return Err(Rejected::lost(error)),
        };
        debug!(%hostname, "TLS established");

        // Extensions advertised before the upgrade are discarded (RFC 3207).
        match self.hello(client_hostname).await {
            Ok(()) => Ok(self),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }

    /// Authenticates using the PLAIN mechanism.
    ///
    /// Credentials are only sent over TLS, or in clear text when `host` is a
    /// loopback address.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the connection is not encrypted, the server
    /// advertises AUTH without PLAIN, or the server rejects the credentials.
    pub async fn auth_plain(
        self,
        username: &str,
        password: &str,
        host: &str,
    ) -> Transition<Client<Authenticated>, Connected> {
        if !self.stream.is_tls() && !is_loopback_host(host) {
            return Err(Rejected::new(Error::InsecureAuth(host.to_string()), self));
        }

        if let Some(mechanisms) = self.server_info.auth_mechanisms()
            && !mechanisms.contains(&AuthMechanism::Plain)
        {
            return Err(Rejected::new(Error::NotSupported("AUTH PLAIN".into()), self));
        }

        // PLAIN response: \0username\0password (RFC 4616)
        let credentials = format!("\0{username}\0{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(encoded),
        };
        self.transition(cmd).await
    }

    /// Starts a mail transaction without authentication.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the MAIL FROM command fails.
    pub async fn mail_from(self, from: &Address) -> Transition<Client<MailTransaction>, Connected> {
        self.transition(Command::MailFrom { from: from.clone() })
            .await
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the MAIL FROM command fails.
    pub async fn mail_from(
        self,
        from: &Address,
    ) -> Transition<Client<MailTransaction>, Authenticated> {
        self.transition(Command::MailFrom { from: from.clone() })
            .await
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the RCPT TO command fails.
    pub async fn rcpt_to(self, to: &Address) -> Transition<Client<RecipientAdded>, MailTransaction> {
        self.transition(Command::RcptTo { to: to.clone() }).await
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: &Address) -> Transition<Self, RecipientAdded> {
        match self.execute(Command::RcptTo { to: to.clone() }).await {
            Ok(_) => Ok(self),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }

    /// Sends DATA and returns a writer for the message content.
    ///
    /// # Errors
    ///
    /// Returns a rejection unless the server answers 354.
    pub async fn data(mut self) -> Transition<DataWriter, RecipientAdded> {
        let reply = match self.send_command(Command::Data).await {
            Ok(reply) => reply,
            Err(error) => return Err(Rejected::new(error, self)),
        };
        match reply.expect_code(ReplyCode::START_DATA) {
            Ok(_) => Ok(DataWriter {
                client: self.into_state(),
                stuffer: DotStuffer::default(),
                buf: Vec::new(),
            }),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }
}

/// Streaming writer for message content after `DATA` was accepted.
///
/// Content is written verbatim apart from SMTP transparency (leading dots are
/// doubled, bare LF becomes CRLF). Dropping the writer without calling
/// [`finish`](Self::finish) closes the connection, which aborts the
/// transaction on the server.
#[derive(Debug)]
pub struct DataWriter {
    client: Client<Data>,
    stuffer: DotStuffer,
    buf: Vec<u8>,
}

impl DataWriter {
    /// Writes a chunk of message content.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.buf.clear();
        self.stuffer.encode(chunk, &mut self.buf);
        self.client.stream.write_all(&self.buf).await
    }

    /// Terminates the message and waits for the server to accept it.
    ///
    /// # Errors
    ///
    /// Returns a rejection if sending the terminator fails or the server
    /// rejects the message.
    pub async fn finish(mut self) -> Transition<Client<Connected>, Connected> {
        self.buf.clear();
        self.stuffer.finish(&mut self.buf);
        if let Err(error) = self.client.stream.write_all(&self.buf).await {
            return Err(Rejected::lost(error));
        }

        let mut client: Client<Connected> = self.client.into_state();
        let reply = match Client::<Connected>::read_reply(&mut client.stream).await {
            Ok(reply) => reply,
            Err(error) => return Err(Rejected::lost(error)),
        };
        match reply.expect_success() {
            Ok(reply) => {
                debug!(reply = %reply.message_text(), "message accepted");
                Ok(client)
            }
            Err(error) => Err(Rejected::new(error, client)),
        }
    }
}

// Common implementation for all states
impl<S> Client<S> {
    fn into_state<N>(self) -> Client<N> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn transition<N>(mut self, cmd: Command) -> Transition<Client<N>, S> {
        match self.execute(cmd).await {
            Ok(_) => Ok(self.into_state()),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }

    async fn execute(&mut self, cmd: Command) -> Result<Reply> {
        self.send_command(cmd).await?.expect_success()
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = ?cmd, "sending");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = Self::read_reply(&mut self.stream).await?;
        debug!(code = %reply.code, "reply");
        Ok(reply)
    }

    async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = stream.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        parse_reply(&lines)
    }

    /// Returns true once the connection has been upgraded to TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and closes the connection (available in any command state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        Ok(())
    }
}
