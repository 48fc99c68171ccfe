//! Credential records and the redacted views that cross the boundary.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::identifiers::CredentialId;

// ============================================================================
// Secret
// ============================================================================

/// A stored password.
///
/// `Debug` is redacted so a secret never lands in a log line by accident.
/// The only way to read it is [`Secret::expose`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the plaintext. Callers forward it into a form field and
    /// nowhere else.
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// ============================================================================
// Credential
// ============================================================================

/// A stored `(url, username, secret)` triple.
///
/// # Format
///
/// ```json
/// { "id": "…", "url": "https://example.com", "username": "a@x.com", "secret": "…" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Store-assigned identifier.
    pub id: CredentialId,

    /// Site the credential was saved for.
    pub url: String,

    /// Account name.
    pub username: String,

    /// Password.
    pub secret: Secret,
}

impl Credential {
    /// Creates a credential with a freshly generated ID.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: CredentialId::generate(),
            url: url.into(),
            username: username.into(),
            secret: Secret::new(secret),
        }
    }

    /// Returns the lowercased host of the saved URL, if it parses.
    #[must_use]
    pub fn hostname(&self) -> Option<String> {
        hostname_of(&self.url)
    }

    /// Returns the secret-free view shown in the popup.
    #[inline]
    #[must_use]
    pub fn summary(&self) -> SuggestionSummary {
        SuggestionSummary {
            username: self.username.clone(),
            url: self.url.clone(),
        }
    }

    /// Returns `true` if this credential is the one a popup entry names.
    #[inline]
    #[must_use]
    pub fn matches_summary(&self, summary: &SuggestionSummary) -> bool {
        self.username == summary.username && self.url == summary.url
    }
}

// ============================================================================
// SuggestionSummary
// ============================================================================

/// What the page may tell the host about a suggestion: no secret, no ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSummary {
    /// Account name.
    pub username: String,

    /// Site the credential was saved for.
    pub url: String,
}

impl SuggestionSummary {
    /// Returns the lowercased host of the URL, or the raw URL when it does
    /// not parse.
    #[must_use]
    pub fn display_host(&self) -> String {
        hostname_of(&self.url).unwrap_or_else(|| self.url.clone())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extracts the lowercased host from a URL string.
pub(crate) fn hostname_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let credential = Credential::new("https://example.com", "a@x.com", "s3cr3t");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("Secret(***)"));
        assert_eq!(credential.secret.expose(), "s3cr3t");
    }

    #[test]
    fn test_credential_wire_shape() {
        let credential = Credential {
            id: CredentialId::new("c1"),
            url: "https://example.com".into(),
            username: "a@x.com".into(),
            secret: Secret::new("s3cr3t"),
        };
        let value = serde_json::to_value(&credential).expect("serialize");
        assert_eq!(value["id"], "c1");
        assert_eq!(value["secret"], "s3cr3t");
    }

    #[test]
    fn test_hostname_is_lowercased() {
        let credential = Credential::new("https://Example.COM/login", "u", "p");
        assert_eq!(credential.hostname().as_deref(), Some("example.com"));
    }

    #[test]
    fn test_summary_has_no_secret() {
        let credential = Credential::new("https://example.com", "a@x.com", "s3cr3t");
        let json = serde_json::to_string(&credential.summary()).expect("serialize");
        assert!(!json.contains("s3cr3t"));
        assert!(credential.matches_summary(&credential.summary()));
    }

    #[test]
    fn test_display_host_falls_back_to_raw() {
        let summary = SuggestionSummary {
            username: "u".into(),
            url: "not a url".into(),
        };
        assert_eq!(summary.display_host(), "not a url");
    }
}
