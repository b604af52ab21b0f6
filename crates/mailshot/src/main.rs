//! `mailshot` - send one email over SMTP.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use mailshot::{Cli, Config, Error, Settings, deliver, normalize_args};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mailshot: {err}");
            if err.is_usage() {
                eprintln!("{}", Cli::command().render_help());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let settings = Settings::load(cli.config.as_deref())?;
    let config = Config::from_cli(cli, &settings)?;
    debug!(server = %config.server, starttls = config.starttls, auth = config.auth, "configured");

    let delivery = deliver(&config, tokio::io::stdin()).await?;
    info!(
        recipients = delivery.recipients.len(),
        tls = delivery.tls,
        authenticated = delivery.authenticated,
        "sent"
    );
    Ok(())
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mailshot={level},mailshot_smtp={level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
