//! Core SMTP types.

mod address;
mod extension;
mod reply;

pub(crate) use address::is_loopback_host;
pub use address::{Address, ServerAddress};
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyCode};
