//! Bearer token carried with every request to the remote service.

use std::fmt;

use crate::error::ValidationError;

/// Environment variable the token is read from when none is passed.
pub const API_KEY_ENV: &str = "TRIPO_API_KEY";

/// An opaque API token.
///
/// Never persisted; `Debug` and `Display` only show a short hint so the
/// value can be logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// Wrap an explicit token. Surrounding whitespace is trimmed.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ValidationError::BlankToken);
        }
        Ok(Self { token })
    }

    /// Read the token from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::resolve(None, std::env::var(API_KEY_ENV).ok())
    }

    /// Prefer an explicitly supplied token, falling back to a configured
    /// one (usually read from [`API_KEY_ENV`]). A blank configured value
    /// counts as missing.
    pub fn resolve(
        explicit: Option<String>,
        configured: Option<String>,
    ) -> Result<Self, ValidationError> {
        match (explicit, configured) {
            (Some(token), _) => Self::new(token),
            (None, Some(token)) if !token.trim().is_empty() => Self::new(token),
            (None, _) => Err(ValidationError::MissingToken(API_KEY_ENV)),
        }
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Short, log-safe hint: `...` plus the last 4 characters, or `****`
    /// when the token is too short to reveal any of it.
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() >= 8 {
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("...{tail}")
        } else {
            "****".to_string()
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credentials").field(&self.hint()).finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hint())
    }
}
