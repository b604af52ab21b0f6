//! SMTP credential resolution.

use std::fmt;

/// Environment variable consulted when no username flag is given.
pub const USER_ENV: &str = "MAILSHOT_USER";

/// Environment variable consulted when no password flag is given.
pub const PASS_ENV: &str = "MAILSHOT_PASS";

/// Username and password for SMTP authentication. Either may be empty.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Authentication username.
    pub username: String,
    /// Authentication password.
    pub password: String,
}

impl Credentials {
    /// Resolves credentials from explicit values, falling back to
    /// [`USER_ENV`] and [`PASS_ENV`].
    #[must_use]
    pub fn resolve(explicit_user: &str, explicit_pass: &str) -> Self {
        Self::resolve_with(explicit_user, explicit_pass, |key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with a custom environment lookup.
    ///
    /// Each field is resolved on its own: a non-empty explicit value wins,
    /// otherwise the variable is read; a missing variable yields `""`.
    #[must_use]
    pub fn resolve_with<F>(explicit_user: &str, explicit_pass: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: &str, key: &str| {
            if explicit.is_empty() {
                lookup(key).unwrap_or_default()
            } else {
                explicit.to_string()
            }
        };

        Self {
            username: pick(explicit_user, USER_ENV),
            password: pick(explicit_pass, PASS_ENV),
        }
    }

    /// Fills in the username if neither flag nor environment supplied one
    /// and a password was resolved. Without a password the fallback is
    /// ignored so a credential-less run stays credential-less.
    #[must_use]
    pub fn or_username(mut self, fallback: Option<&str>) -> Self {
        if self.username.is_empty()
            && !self.password.is_empty()
            && let Some(username) = fallback
        {
            self.username = username.to_string();
        }
        self
    }

    /// Returns true if a username or a password is present.
    #[must_use]
    pub fn is_supplied(&self) -> bool {
        !self.username.is_empty() || !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}
