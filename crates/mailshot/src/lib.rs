//! # mailshot
//!
//! Send one email over SMTP from the command line.
//!
//! This crate provides:
//! - Flag parsing and settings-file defaults
//! - Address list parsing and header composition
//! - Input checks that run before any network use
//! - The session driver built on `mailshot-smtp`
//!
//! ```no_run
//! use mailshot::{Cli, Config, Settings, deliver};
//! use clap::Parser;
//!
//! # async fn example() -> mailshot::Result<()> {
//! let cli = Cli::parse_from(["mailshot", "-f=a@x.com", "-t=b@x.com", "-m=Hello"]);
//! let config = Config::from_cli(&cli, &Settings::load(None)?)?;
//! let delivery = deliver(&config, tokio::io::empty()).await?;
//! println!("sent to {} recipients", delivery.recipients.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod address;
pub mod cli;
pub mod compose;
pub mod config;
pub mod credentials;
pub mod encoding;
mod error;
pub mod session;
pub mod settings;
pub mod validate;

pub use address::{AddressError, Mailbox, parse_address_list};
pub use cli::{Cli, normalize_args};
pub use compose::{Message, envelope_recipients};
pub use config::Config;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use session::{Delivery, SessionState, Warning, deliver};
pub use settings::{Settings, SettingsError};
