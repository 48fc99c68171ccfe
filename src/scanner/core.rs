//! Page-side protocol state for one page load.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, info, trace, warn};
use url::Url;

use crate::identifiers::FieldId;
use crate::protocol::{Credential, InboundMessage, OutboundMessage, ShowPopupPayload};
use crate::transport::OutboundChannel;

use super::detect::{self, Detection, LoginPair};
use super::dom::Dom;

// ============================================================================
// FieldScanner
// ============================================================================

/// One scanner instance inside one sandboxed page context.
///
/// All flags here are ephemeral: they live as long as the page context and
/// are gone when the page is replaced. The host's
/// [`Session`](crate::host::Session) is the durable record.
///
/// The scanner is event-driven and synchronous; timers (blur grace, re-scan
/// throttle) belong to whoever hosts it.
#[derive(Debug)]
pub struct FieldScanner {
    outbound: OutboundChannel,
    detection: Detection,
    requested: bool,
    filled: bool,
    popup_requested: bool,
    suggestions: Option<Vec<Credential>>,
    pending_focus: Option<FieldId>,
    last_focused: Option<FieldId>,
}

impl FieldScanner {
    /// Creates a scanner writing to `outbound`.
    #[must_use]
    pub fn new(outbound: OutboundChannel) -> Self {
        Self {
            outbound,
            detection: Detection::default(),
            requested: false,
            filled: false,
            popup_requested: false,
            suggestions: None,
            pending_focus: None,
            last_focused: None,
        }
    }
}

// ============================================================================
// FieldScanner - Accessors
// ============================================================================

impl FieldScanner {
    /// Fields found by the last scan.
    #[inline]
    #[must_use]
    pub fn detection(&self) -> &Detection {
        &self.detection
    }

    /// Returns `true` once `REQUEST_CREDENTIALS` has been sent.
    #[inline]
    #[must_use]
    pub fn has_requested(&self) -> bool {
        self.requested
    }

    /// Returns `true` once a fill has been committed.
    #[inline]
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Cached suggestions, `None` until the host answers.
    #[inline]
    #[must_use]
    pub fn suggestions(&self) -> Option<&[Credential]> {
        self.suggestions.as_deref()
    }
}

// ============================================================================
// FieldScanner - Events
// ============================================================================

impl FieldScanner {
    /// Re-evaluates the page. Sends the credential request on the first
    /// scan that finds anything.
    ///
    /// Returns the number of tracked fields.
    pub fn scan<D: Dom + ?Sized>(&mut self, dom: &D) -> usize {
        self.detection = detect::detect(&dom.inputs());
        let tracked = self.detection.records.len();
        trace!(tracked, pairs = self.detection.pairs.len(), "Scanned page");

        if tracked > 0 && !self.requested {
            match Url::parse(dom.location()) {
                Ok(url) => {
                    self.requested = true;
                    debug!(url = %url, tracked, "Login fields detected, requesting credentials");
                    self.emit(&OutboundMessage::RequestCredentials { url });
                }
                Err(e) => warn!(error = %e, "Page location is not an absolute URL"),
            }
        }

        tracked
    }

    /// A field gained focus.
    pub fn on_focus<D: Dom + ?Sized>(&mut self, dom: &D, field: FieldId) {
        if !self.detection.tracks(field) {
            return;
        }
        self.last_focused = Some(field);

        if self.filled {
            return;
        }

        match self.suggestions.as_deref() {
            Some([]) => {}
            Some(_) => self.show(dom, field),
            None => {
                trace!(%field, "Focus before suggestions, deferring popup");
                self.pending_focus = Some(field);
            }
        }
    }

    /// The blur grace delay elapsed. Hides the popup unless focus landed on
    /// another tracked field.
    pub fn on_blur_settled<D: Dom + ?Sized>(&mut self, dom: &D) {
        let focus_is_tracked = dom
            .active_field()
            .is_some_and(|field| self.detection.tracks(field));
        if focus_is_tracked {
            return;
        }

        self.pending_focus = None;
        if self.popup_requested {
            self.popup_requested = false;
            self.emit(&OutboundMessage::HidePopup);
        }
    }

    /// Handles a message the host posted.
    pub fn on_message<D: Dom + ?Sized>(&mut self, dom: &mut D, message: InboundMessage) {
        match message {
            InboundMessage::Credentials(credentials) => self.accept_credentials(dom, credentials),
            InboundMessage::Fill(credential) => self.fill(dom, &credential),
        }
    }
}

// ============================================================================
// FieldScanner - Internal
// ============================================================================

impl FieldScanner {
    fn accept_credentials<D: Dom + ?Sized>(&mut self, dom: &D, credentials: Vec<Credential>) {
        debug!(count = credentials.len(), "Suggestions received");
        let has_any = !credentials.is_empty();
        self.suggestions = Some(credentials);

        let Some(pending) = self.pending_focus.take() else {
            return;
        };
        if self.filled || !has_any {
            return;
        }
        if dom.active_field() == Some(pending) {
            self.show(dom, pending);
        } else {
            trace!(%pending, "Focus moved on before suggestions arrived");
        }
    }

    fn show<D: Dom + ?Sized>(&mut self, dom: &D, field: FieldId) {
        if self.filled {
            return;
        }
        let Some(geometry) = dom.field_rect(field) else {
            debug!(%field, "Focused field left the document");
            return;
        };
        let suggestions = self
            .suggestions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(Credential::summary)
            .collect();

        self.popup_requested = true;
        self.emit(&OutboundMessage::ShowPopup(ShowPopupPayload {
            geometry,
            suggestions,
        }));
    }

    fn fill<D: Dom + ?Sized>(&mut self, dom: &mut D, credential: &Credential) {
        let pair = self.target_pair();
        self.filled = true;
        self.popup_requested = false;
        self.pending_focus = None;

        let Some(pair) = pair else {
            warn!("Fill received but no login fields are tracked");
            return;
        };

        match pair.username {
            Some(field) => {
                if !dom.set_field_value(field, &credential.username) {
                    warn!(%field, "Username field no longer exists, skipped");
                }
            }
            None => debug!("No username field inferred, filling password only"),
        }
        if !dom.set_field_value(pair.password, credential.secret.expose()) {
            warn!(field = %pair.password, "Password field no longer exists, skipped");
        }

        info!(username = %credential.username, "Credential filled");
    }

    fn target_pair(&self) -> Option<LoginPair> {
        self.last_focused
            .and_then(|field| self.detection.pair_for(field))
            .or_else(|| self.detection.pairs.first())
            .copied()
    }

    fn emit(&self, message: &OutboundMessage) {
        if let Err(e) = self.outbound.emit(message) {
            warn!(error = %e, tag = message.tag().as_str(), "Outbound message lost");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
