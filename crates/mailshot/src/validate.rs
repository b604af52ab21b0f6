//! Input checks applied before any network interaction.

use crate::error::{Error, Result};

/// Fails with [`Error::Injection`] if `value` contains a CR or LF anywhere,
/// including the first position.
///
/// # Errors
///
/// Returns an error naming `field` when a line break is found.
pub fn reject_control_chars(field: &'static str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::Injection { field });
    }
    Ok(())
}

/// Fails with [`Error::MissingField`] if `value` is empty or only whitespace.
///
/// # Errors
///
/// Returns an error naming `field` when the value is blank.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::MissingField { field });
    }
    Ok(())
}
