//! # mailshot-smtp
//!
//! A small SMTP submission client (RFC 5321) used by `mailshot` to deliver a
//! single message.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Protocol coverage**: EHLO (HELO fallback), STARTTLS, AUTH PLAIN,
//!   MAIL FROM, RCPT TO, DATA, QUIT
//! - **Streaming DATA**: message content is written in chunks with
//!   dot-stuffing and line ending normalization
//! - **Clean shutdown**: failed transitions keep the connection so `QUIT`
//!   can still be sent
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailshot_smtp::{Address, Client, ServerAddress};
//!
//! #[tokio::main]
//! async fn main() -> mailshot_smtp::Result<()> {
//!     let server = ServerAddress::parse("smtp.example.com:587")?;
//!     let client = Client::connect(&server, "localhost").await?;
//!     let client = client.starttls(&server.host, "localhost").await?;
//!     let client = client.auth_plain("user@example.com", "password", &server.host).await?;
//!
//!     let from = Address::new("sender@example.com")?;
//!     let to = Address::new("recipient@example.com")?;
//!
//!     let client = client.mail_from(&from).await?;
//!     let client = client.rcpt_to(&to).await?;
//!     let mut data = client.data().await?;
//!     data.write(b"Subject: Test\r\n\r\nHello, World!\r\n").await?;
//!     let client = data.finish().await?;
//!
//!     client.quit().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── starttls() ───→ Connected (TLS)
//! └──────────────┘
//!        │ └──── auth_plain() ───→ Authenticated
//!        │                               │
//!        └─── mail_from() ───────────────┴──→ MailTransaction
//!                                                 │ rcpt_to()
//!                                                 ▼
//!                        DataWriter ←── data() ── RecipientAdded
//!                            │ finish()
//!                            ▼
//!                        Connected ─── quit()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, DataWriter, MailTransaction, RecipientAdded,
    Rejected, ServerInfo, SmtpConnection, Transition,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode, ServerAddress};
