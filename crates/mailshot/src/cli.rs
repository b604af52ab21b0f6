//! Command line flags.

use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Long flags also accepted with a single dash (`-cc`, `-bcc=...`).
const SINGLE_DASH_LONG: [&str; 4] = ["cc", "bcc", "xu", "xp"];

/// Send one email over SMTP.
///
/// The message body is taken from `-m`, or read from standard input until
/// end of file when `-m` is empty.
#[derive(Debug, Clone, Parser)]
#[command(name = "mailshot", version, override_usage = "mailshot -f=<email> [options]")]
pub struct Cli {
    /// From address (exactly one)
    #[arg(short = 'f', long = "from", value_name = "EMAIL")]
    pub from: Option<String>,

    /// To address list (comma separated)
    #[arg(short = 't', long = "to", value_name = "LIST", default_value = "")]
    pub to: String,

    /// CC address list (comma separated)
    #[arg(long = "cc", value_name = "LIST", default_value = "")]
    pub cc: String,

    /// BCC address list (comma separated)
    #[arg(long = "bcc", value_name = "LIST", default_value = "")]
    pub bcc: String,

    /// SMTP server host:port [default: smtp.gmail.com:587]
    #[arg(short = 's', long = "server", value_name = "HOST:PORT")]
    pub server: Option<String>,

    /// Message body (uses stdin if empty)
    #[arg(short = 'm', long = "message", value_name = "TEXT", default_value = "")]
    pub message: String,

    /// Subject
    #[arg(short = 'u', long = "subject", value_name = "TEXT", default_value = "")]
    pub subject: String,

    /// Use STARTTLS when the server offers it [default: true]
    #[arg(
        short = 'l',
        long = "starttls",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub starttls: Option<bool>,

    /// Use SMTP authentication when the server offers it [default: true]
    #[arg(
        short = 'a',
        long = "auth",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub auth: Option<bool>,

    /// Username for SMTP authentication (env var MAILSHOT_USER if blank, then
    /// the settings file when a password is set)
    #[arg(long = "xu", value_name = "USER", default_value = "")]
    pub user: String,

    /// Password for SMTP authentication (env var MAILSHOT_PASS if blank)
    #[arg(long = "xp", value_name = "PASSWORD", default_value = "", hide_default_value = true)]
    pub password: String,

    /// Settings file [default: <config dir>/mailshot/settings.json]
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

/// Rewrites single-dash long flags (`-cc`, `-bcc=x`, `-xu`, `-xp`) into
/// their double-dash form so they parse like any other long flag.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut after_separator = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if after_separator {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                after_separator = true;
                return arg;
            }
            let Some(rest) = text.strip_prefix('-').filter(|r| !r.starts_with('-')) else {
                return arg;
            };
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if SINGLE_DASH_LONG.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = parse(&["mailshot"]);
        assert_eq!(cli.from, None);
        assert_eq!(cli.server, None);
        assert_eq!(cli.to, "");
        assert_eq!(cli.message, "");
        assert_eq!(cli.starttls, None);
        assert_eq!(cli.auth, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn short_flags_with_equals_and_space() {
        let cli = parse(&[
            "mailshot",
            "-f=a@x.com",
            "-t",
            "b@x.com,c@x.com",
            "-u=Hi",
            "-m",
            "Hello",
            "-s=localhost:2525",
        ]);
        assert_eq!(cli.from.as_deref(), Some("a@x.com"));
        assert_eq!(cli.to, "b@x.com,c@x.com");
        assert_eq!(cli.subject, "Hi");
        assert_eq!(cli.message, "Hello");
        assert_eq!(cli.server.as_deref(), Some("localhost:2525"));
    }

    #[test]
    fn single_dash_long_flags() {
        let cli = parse(&[
            "mailshot",
            "-cc=d@x.com",
            "-bcc",
            "e@x.com",
            "-xu=user",
            "-xp",
            "secret",
        ]);
        assert_eq!(cli.cc, "d@x.com");
        assert_eq!(cli.bcc, "e@x.com");
        assert_eq!(cli.user, "user");
        assert_eq!(cli.password, "secret");
    }

    #[test]
    fn config_path_and_verbosity() {
        let cli = parse(&["mailshot", "-c", "/tmp/settings.json", "-vv"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.json")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn boolean_switches() {
        let cli = parse(&["mailshot", "-l=false", "-a"]);
        assert_eq!(cli.starttls, Some(false));
        assert_eq!(cli.auth, Some(true));

        let cli = parse(&["mailshot", "--starttls=true", "--auth=false"]);
        assert_eq!(cli.starttls, Some(true));
        assert_eq!(cli.auth, Some(false));
    }

    #[test]
    fn normalize_leaves_other_arguments_alone() {
        let args = normalize_args(["mailshot", "-v", "-cc", "--bcc=x", "--", "-xu"]);
        assert_eq!(
            args,
            vec!["mailshot", "-v", "--cc", "--bcc=x", "--", "-xu"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }
}
