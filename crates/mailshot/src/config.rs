//! Validated send configuration.

use crate::address::{Mailbox, parse_address_list};
use crate::cli::Cli;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::validate::{reject_control_chars, require_non_blank};
use mailshot_smtp::ServerAddress;

/// Server used when neither a flag nor the settings file names one.
pub const DEFAULT_SERVER: &str = "smtp.gmail.com:587";

/// Name announced in EHLO unless the settings file overrides it.
pub const DEFAULT_HELO_NAME: &str = "localhost";

/// Everything needed to send one message, checked before any network use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Sender, used for the From header and MAIL FROM.
    pub from: Mailbox,
    /// To recipients, in input order.
    pub to: Vec<Mailbox>,
    /// CC recipients, in input order.
    pub cc: Vec<Mailbox>,
    /// BCC recipients, in input order. Never written to headers.
    pub bcc: Vec<Mailbox>,
    /// SMTP server.
    pub server: ServerAddress,
    /// Subject text; empty means no Subject header.
    pub subject: String,
    /// Inline body; `None` means read standard input.
    pub message: Option<String>,
    /// Upgrade with STARTTLS when the server offers it.
    pub starttls: bool,
    /// Authenticate when the server offers AUTH.
    pub auth: bool,
    /// Credentials for AUTH PLAIN.
    pub credentials: Credentials,
    /// Name announced in EHLO/HELO.
    pub helo_name: String,
}

impl Config {
    /// Builds the configuration from flags, settings and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any field is missing, contains a line break, or
    /// does not parse.
    pub fn from_cli(cli: &Cli, settings: &Settings) -> Result<Self> {
        Self::build(cli, settings, |key| std::env::var(key).ok())
    }

    /// Like [`from_cli`](Self::from_cli) with a custom environment lookup.
    ///
    /// # Errors
    ///
    /// See [`from_cli`](Self::from_cli).
    pub fn build<F>(cli: &Cli, settings: &Settings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from = cli
            .from
            .as_deref()
            .or(settings.from.as_deref())
            .unwrap_or_default();
        let server = cli
            .server
            .as_deref()
            .or(settings.server.as_deref())
            .unwrap_or(DEFAULT_SERVER);
        let helo_name = settings.helo_name.as_deref().unwrap_or(DEFAULT_HELO_NAME);

        for (field, value) in [
            ("from", from),
            ("to", cli.to.as_str()),
            ("cc", cli.cc.as_str()),
            ("bcc", cli.bcc.as_str()),
            ("subject", cli.subject.as_str()),
            ("helo name", helo_name),
        ] {
            reject_control_chars(field, value)?;
        }
        require_non_blank("from", from)?;
        require_non_blank("server", server)?;

        let mut senders = parse_list("from", from)?;
        if senders.len() != 1 {
            return Err(Error::Usage("only one from address allowed".into()));
        }
        let from = senders.remove(0);

        let to = parse_list("to", &cli.to)?;
        let cc = parse_list("cc", &cli.cc)?;
        let bcc = parse_list("bcc", &cli.bcc)?;
        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            return Err(Error::Usage(
                "at least one recipient (to, cc or bcc) is required".into(),
            ));
        }

        let server =
            ServerAddress::parse(server.trim()).map_err(|err| Error::Usage(err.to_string()))?;

        let credentials = Credentials::resolve_with(&cli.user, &cli.password, env)
            .or_username(settings.username.as_deref());

        let message = (!cli.message.is_empty()).then(|| cli.message.clone());

        Ok(Self {
            from,
            to,
            cc,
            bcc,
            server,
            subject: cli.subject.clone(),
            message,
            starttls: cli.starttls.or(settings.starttls).unwrap_or(true),
            auth: cli.auth.or(settings.auth).unwrap_or(true),
            credentials,
            helo_name: helo_name.to_string(),
        })
    }
}

fn parse_list(list: &'static str, raw: &str) -> Result<Vec<Mailbox>> {
    parse_address_list(raw).map_err(|source| Error::Parse { list, source })
}
