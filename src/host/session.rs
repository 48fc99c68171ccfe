//! Per-tab protocol state.
//!
//! A [`Session`] is the host's authoritative record for one tab and one
//! navigation. Every navigation starts a fresh session under a new
//! [`Generation`]; anything tagged with an older generation is stale.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::identifiers::Generation;
use crate::protocol::credential::hostname_of;
use crate::protocol::{Credential, Geometry, SuggestionSummary};

// ============================================================================
// SessionState
// ============================================================================

/// Observable state of a session.
///
/// ```text
/// Idle → Injected → CredentialsCached ⇄ PopupVisible → Filled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Fresh navigation, nothing injected yet.
    Idle,
    /// Scanner injected.
    Injected,
    /// Lookup result delivered to the page.
    CredentialsCached,
    /// Popup on screen.
    PopupVisible,
    /// A credential was filled. Terminal.
    Filled,
}

// ============================================================================
// PopupRefusal
// ============================================================================

/// Why a `SHOW_POPUP` was not honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupRefusal {
    /// The session is filled.
    Filled,
    /// No credentials were delivered for this generation.
    NoCredentials,
    /// None of the requested entries names a delivered credential.
    UnknownEntries,
}

impl fmt::Display for PopupRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Filled => "session already filled",
            Self::NoCredentials => "no credentials delivered",
            Self::UnknownEntries => "entries do not match delivered credentials",
        })
    }
}

// ============================================================================
// Session
// ============================================================================

/// Host-side state for one tab.
#[derive(Debug, Clone, Default)]
pub struct Session {
    generation: Generation,
    committed_url: Option<Url>,
    injected: bool,
    requested: bool,
    delivered: bool,
    suggestions: Vec<Credential>,
    popup_visible: bool,
    anchor: Option<Geometry>,
    filled: bool,
}

impl Session {
    /// Creates an idle session at the initial generation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new navigation: bumps the generation and forgets everything
    /// else. Returns the new generation.
    pub fn reset(&mut self) -> Generation {
        let generation = self.generation.next();
        *self = Self {
            generation,
            ..Self::default()
        };
        generation
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Current generation.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Derived state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.filled {
            SessionState::Filled
        } else if self.popup_visible {
            SessionState::PopupVisible
        } else if self.delivered {
            SessionState::CredentialsCached
        } else if self.injected {
            SessionState::Injected
        } else {
            SessionState::Idle
        }
    }

    /// Returns `true` once the scanner was injected for this navigation.
    #[inline]
    #[must_use]
    pub fn is_injected(&self) -> bool {
        self.injected
    }

    /// Returns `true` once a lookup was dispatched for this navigation.
    #[inline]
    #[must_use]
    pub fn has_requested(&self) -> bool {
        self.requested
    }

    /// Returns `true` once a credential was filled.
    #[inline]
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Returns `true` while the popup is on screen.
    #[inline]
    #[must_use]
    pub fn is_popup_visible(&self) -> bool {
        self.popup_visible
    }

    /// Credentials delivered for this navigation.
    #[inline]
    #[must_use]
    pub fn suggestions(&self) -> &[Credential] {
        &self.suggestions
    }

    /// Field geometry of the last shown popup, surface-local.
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> Option<Geometry> {
        self.anchor
    }

    /// URL the tab committed to, if reported.
    #[inline]
    #[must_use]
    pub fn committed_url(&self) -> Option<&Url> {
        self.committed_url.as_ref()
    }
}

// ============================================================================
// Session - Transitions
// ============================================================================

impl Session {
    /// Records the committed URL of the current navigation.
    pub fn commit_url(&mut self, url: Url) {
        self.committed_url = Some(url);
    }

    /// Records a successful injection.
    pub fn mark_injected(&mut self) {
        self.injected = true;
    }

    /// Returns `true` if the page may ask for credentials of `url`.
    ///
    /// Before the URL is committed any page URL is accepted.
    #[must_use]
    pub fn permits_request(&self, url: &Url) -> bool {
        let Some(committed) = &self.committed_url else {
            return true;
        };
        let requested = url.host_str().map(str::to_ascii_lowercase);
        let expected = committed.host_str().map(str::to_ascii_lowercase);
        requested.is_some() && requested == expected
    }

    /// Latches the request. Returns the generation to tag the lookup with,
    /// or `None` if a lookup was already dispatched.
    pub fn begin_request(&mut self) -> Option<Generation> {
        if self.requested {
            return None;
        }
        self.requested = true;
        Some(self.generation)
    }

    /// Stores a lookup result tagged with `generation`.
    ///
    /// Returns `false` and leaves the session untouched if the result is
    /// stale.
    pub fn accept_credentials(&mut self, generation: Generation, credentials: Vec<Credential>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.suggestions = credentials;
        self.delivered = true;
        true
    }

    /// Validates a popup request and marks the popup visible.
    ///
    /// Returns the requested entries that name a delivered credential, in
    /// request order.
    ///
    /// # Errors
    ///
    /// Returns the reason when the popup must not be shown.
    pub fn open_popup(
        &mut self,
        anchor: Geometry,
        requested: &[SuggestionSummary],
    ) -> std::result::Result<Vec<SuggestionSummary>, PopupRefusal> {
        if self.filled {
            return Err(PopupRefusal::Filled);
        }
        if !self.delivered || self.suggestions.is_empty() {
            return Err(PopupRefusal::NoCredentials);
        }

        let entries: Vec<SuggestionSummary> = requested
            .iter()
            .filter(|entry| self.suggestions.iter().any(|c| c.matches_summary(entry)))
            .cloned()
            .collect();
        if entries.is_empty() {
            return Err(PopupRefusal::UnknownEntries);
        }

        self.popup_visible = true;
        self.anchor = Some(anchor);
        Ok(entries)
    }

    /// Marks the popup hidden. Returns `true` if it was visible.
    pub fn close_popup(&mut self) -> bool {
        std::mem::replace(&mut self.popup_visible, false)
    }

    /// Commits the selection of `entry`.
    ///
    /// Returns the session's own credential for the entry, or `None` if the
    /// session is filled or the entry names nothing it delivered.
    pub fn commit_fill(&mut self, entry: &SuggestionSummary) -> Option<Credential> {
        if self.filled {
            return None;
        }
        let credential = self
            .suggestions
            .iter()
            .find(|c| c.matches_summary(entry))
            .cloned()?;

        self.filled = true;
        self.popup_visible = false;
        Some(credential)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Returns `true` if a stored credential belongs to the requested page.
///
/// Exact, case-insensitive host comparison.
#[must_use]
pub fn host_matches(credential: &Credential, page: &Url) -> bool {
    match (hostname_of(&credential.url), page.host_str()) {
        (Some(stored), Some(host)) => stored == host.to_ascii_lowercase(),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new("https://example.com", "a@x.com", "s3cr3t")
    }

    fn anchor() -> Geometry {
        Geometry::new(10.0, 10.0, 200.0, 30.0)
    }

    fn cached() -> Session {
        let mut session = Session::new();
        session.mark_injected();
        let generation = session.begin_request().expect("first request");
        assert!(session.accept_credentials(generation, vec![credential()]));
        session
    }

    #[test]
    fn test_state_progression() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);

        session.mark_injected();
        assert_eq!(session.state(), SessionState::Injected);

        let generation = session.begin_request().expect("first request");
        session.accept_credentials(generation, vec![credential()]);
        assert_eq!(session.state(), SessionState::CredentialsCached);

        session
            .open_popup(anchor(), &[credential().summary()])
            .expect("show");
        assert_eq!(session.state(), SessionState::PopupVisible);

        assert!(session.close_popup());
        assert_eq!(session.state(), SessionState::CredentialsCached);

        session
            .open_popup(anchor(), &[credential().summary()])
            .expect("show");
        assert!(session.commit_fill(&credential().summary()).is_some());
        assert_eq!(session.state(), SessionState::Filled);
    }

    #[test]
    fn test_request_latched() {
        let mut session = Session::new();
        assert!(session.begin_request().is_some());
        assert!(session.begin_request().is_none());

        session.reset();
        assert!(session.begin_request().is_some());
    }

    #[test]
    fn test_stale_generation_rejected() {
        let mut session = Session::new();
        let old = session.begin_request().expect("request");
        let new = session.reset();
        assert!(new > old);

        assert!(!session.accept_credentials(old, vec![credential()]));
        assert!(session.suggestions().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_filled_is_terminal() {
        let mut session = cached();
        assert!(session.commit_fill(&credential().summary()).is_some());

        assert_eq!(
            session.open_popup(anchor(), &[credential().summary()]),
            Err(PopupRefusal::Filled)
        );
        assert!(session.commit_fill(&credential().summary()).is_none());
        assert_eq!(session.state(), SessionState::Filled);
    }

    #[test]
    fn test_popup_refusals() {
        let mut session = Session::new();
        assert_eq!(
            session.open_popup(anchor(), &[credential().summary()]),
            Err(PopupRefusal::NoCredentials)
        );

        let mut session = cached();
        let forged = SuggestionSummary {
            username: "mallory".into(),
            url: "https://example.com".into(),
        };
        assert_eq!(
            session.open_popup(anchor(), &[forged]),
            Err(PopupRefusal::UnknownEntries)
        );
        assert!(!session.is_popup_visible());
    }

    #[test]
    fn test_open_popup_filters_unknown_entries() {
        let mut session = cached();
        let forged = SuggestionSummary {
            username: "mallory".into(),
            url: "https://evil.test".into(),
        };
        let entries = session
            .open_popup(anchor(), &[forged, credential().summary()])
            .expect("show");
        assert_eq!(entries, vec![credential().summary()]);
        assert_eq!(session.anchor(), Some(anchor()));
    }

    #[test]
    fn test_permits_request() {
        let mut session = Session::new();
        let page = Url::parse("https://example.com/login").expect("url");
        assert!(session.permits_request(&page));

        session.commit_url(Url::parse("https://EXAMPLE.com/").expect("url"));
        assert!(session.permits_request(&page));
        assert!(!session.permits_request(&Url::parse("https://bank.test/").expect("url")));
    }

    #[test]
    fn test_host_matches() {
        let page = Url::parse("https://Example.COM/login").expect("url");
        assert!(host_matches(&credential(), &page));
        assert!(!host_matches(
            &Credential::new("https://www.example.com", "a", "b"),
            &page
        ));
        assert!(!host_matches(&Credential::new("not a url", "a", "b"), &page));
    }
}
