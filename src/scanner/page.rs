//! In-process sandboxed page context.
//!
//! [`SandboxPage`] plays the untrusted side of the bridge: it owns a
//! [`MemoryDocument`], the per-context injection marker and at most one
//! [`FieldScanner`], and runs the scanner's timers on tokio. The host only
//! sees it through [`SandboxedSurface`].
//!
//! # Example
//!
//! ```ignore
//! let (outbound, rx) = outbound_channel();
//! let page = SandboxPage::new(document, outbound, ScannerOptions::default(), bounds);
//!
//! page.inject_scanner().await?;
//! page.set_ready();
//! page.focus(password_field);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::FieldId;
use crate::options::ScannerOptions;
use crate::protocol::{Geometry, InboundMessage};
use crate::transport::{OutboundChannel, SandboxedSurface};

use super::core::FieldScanner;
use super::dom::MemoryDocument;
use super::throttle::{RescanThrottle, Trigger};

// ============================================================================
// Types
// ============================================================================

/// Everything that lives inside the page's JavaScript realm.
struct PageState {
    document: MemoryDocument,
    /// Doubles as the global injection marker.
    scanner: Option<FieldScanner>,
    throttle: RescanThrottle,
    /// Bumped when the realm is replaced; stale timers compare against it.
    load_id: u64,
    /// Bumped on every focus change; a blur timer only settles if nothing
    /// moved focus since it started.
    focus_epoch: u64,
    scans: usize,
}

struct PageInner {
    state: Mutex<PageState>,
    outbound: OutboundChannel,
    options: ScannerOptions,
    bounds: Mutex<Geometry>,
}

// ============================================================================
// SandboxPage
// ============================================================================

/// A handle to one in-process sandboxed page context.
#[derive(Clone)]
pub struct SandboxPage {
    inner: Arc<PageInner>,
}

impl fmt::Debug for SandboxPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SandboxPage")
            .field("load_id", &state.load_id)
            .field("scanner_active", &state.scanner.is_some())
            .finish_non_exhaustive()
    }
}

impl SandboxPage {
    /// Creates a page context showing `document`.
    #[must_use]
    pub fn new(
        document: MemoryDocument,
        outbound: OutboundChannel,
        options: ScannerOptions,
        bounds: Geometry,
    ) -> Self {
        Self {
            inner: Arc::new(PageInner {
                state: Mutex::new(PageState {
                    document,
                    scanner: None,
                    throttle: RescanThrottle::new(options.rescan_throttle),
                    load_id: 0,
                    focus_epoch: 0,
                    scans: 0,
                }),
                outbound,
                options,
                bounds: Mutex::new(bounds),
            }),
        }
    }
}

// ============================================================================
// SandboxPage - Page Lifecycle
// ============================================================================

impl SandboxPage {
    /// Replaces the realm with a new document. Any running scanner and its
    /// timers die with the old realm.
    pub fn load(&self, document: MemoryDocument) {
        let mut state = self.inner.state.lock();
        state.document = document;
        state.scanner = None;
        state.throttle = RescanThrottle::new(self.inner.options.rescan_throttle);
        state.load_id += 1;
        state.scans = 0;
        debug!(load_id = state.load_id, "Page context replaced");
    }

    /// Starts a scanner unless one is already running in this realm.
    ///
    /// Returns `true` if a new instance was started.
    pub fn install_scanner(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.scanner.is_some() {
            debug!(load_id = state.load_id, "Scanner already active, skipping injection");
            return false;
        }

        state.scanner = Some(FieldScanner::new(self.inner.outbound.clone()));
        debug!(load_id = state.load_id, "Scanner installed");

        if state.document.is_ready() {
            Self::scan_locked(&mut state);
        }
        true
    }

    /// Fires document readiness.
    pub fn set_ready(&self) {
        let mut state = self.inner.state.lock();
        if state.document.is_ready() {
            return;
        }
        state.document.set_ready(true);
        if state.scanner.is_some() {
            Self::scan_locked(&mut state);
        }
    }

    /// Mutates the document, then asks for a throttled re-scan.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut MemoryDocument) -> R) -> R {
        let result = f(&mut self.inner.state.lock().document);
        self.schedule_rescan();
        result
    }

    /// Reads the document.
    pub fn read<R>(&self, f: impl FnOnce(&MemoryDocument) -> R) -> R {
        f(&self.inner.state.lock().document)
    }

    /// Moves the surface inside the host window.
    pub fn set_bounds(&self, bounds: Geometry) {
        *self.inner.bounds.lock() = bounds;
    }
}

// ============================================================================
// SandboxPage - User Input
// ============================================================================

impl SandboxPage {
    /// Focuses a field. Returns `false` if the field does not exist.
    pub fn focus(&self, field: FieldId) -> bool {
        let mut state = self.inner.state.lock();
        let PageState {
            document,
            scanner,
            focus_epoch,
            ..
        } = &mut *state;

        if !document.focus(field) {
            return false;
        }
        *focus_epoch += 1;
        if let Some(scanner) = scanner {
            scanner.on_focus(&*document, field);
        }
        true
    }

    /// Removes focus from the page and starts the blur grace timer.
    pub fn blur(&self) {
        let (load_id, epoch) = {
            let mut state = self.inner.state.lock();
            state.document.blur();
            state.focus_epoch += 1;
            (state.load_id, state.focus_epoch)
        };

        let page = self.clone();
        let grace = self.inner.options.blur_grace;
        tokio::spawn(async move {
            sleep(grace).await;
            page.settle_blur(load_id, epoch);
        });
    }

    /// Delivers a value posted onto the page's messaging surface.
    ///
    /// Returns `true` if the scanner consumed it.
    pub fn post_value(&self, value: &Value) -> bool {
        let Some(message) = InboundMessage::from_value(value) else {
            trace!("Ignoring foreign page message");
            return false;
        };

        let mut state = self.inner.state.lock();
        let PageState {
            document, scanner, ..
        } = &mut *state;

        match scanner {
            Some(scanner) => {
                scanner.on_message(document, message);
                true
            }
            None => {
                debug!(tag = message.tag(), "No scanner listening, message dropped");
                false
            }
        }
    }
}

// ============================================================================
// SandboxPage - Introspection
// ============================================================================

impl SandboxPage {
    /// Returns `true` if a scanner runs in the current realm.
    #[must_use]
    pub fn is_scanner_active(&self) -> bool {
        self.inner.state.lock().scanner.is_some()
    }

    /// Returns `true` if the current realm's scanner has filled the form.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.inner
            .state
            .lock()
            .scanner
            .as_ref()
            .is_some_and(FieldScanner::is_filled)
    }

    /// Number of scans run in the current realm.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        self.inner.state.lock().scans
    }
}

// ============================================================================
// SandboxPage - Internal
// ============================================================================

impl SandboxPage {
    fn scan_locked(state: &mut PageState) {
        let PageState {
            document,
            scanner,
            throttle,
            scans,
            ..
        } = state;

        if let Some(scanner) = scanner {
            throttle.mark_run(Instant::now());
            scanner.scan(&*document);
            *scans += 1;
        }
    }

    fn schedule_rescan(&self) {
        let mut state = self.inner.state.lock();
        if state.scanner.is_none() || !state.document.is_ready() {
            return;
        }

        match state.throttle.request(Instant::now()) {
            Trigger::Now => {
                let PageState {
                    document,
                    scanner,
                    scans,
                    ..
                } = &mut *state;
                if let Some(scanner) = scanner {
                    scanner.scan(&*document);
                    *scans += 1;
                }
            }
            Trigger::After(delay) => {
                let page = self.clone();
                let load_id = state.load_id;
                trace!(delay_ms = delay.as_millis() as u64, "Re-scan deferred");
                tokio::spawn(async move {
                    sleep(delay).await;
                    page.run_deferred_rescan(load_id);
                });
            }
            Trigger::Coalesced => trace!("Re-scan already scheduled"),
        }
    }

    fn run_deferred_rescan(&self, load_id: u64) {
        let mut state = self.inner.state.lock();
        if state.load_id != load_id {
            return;
        }
        state.throttle.fire(Instant::now());
        let PageState {
            document,
            scanner,
            scans,
            ..
        } = &mut *state;
        if let Some(scanner) = scanner {
            scanner.scan(&*document);
            *scans += 1;
        }
    }

    fn settle_blur(&self, load_id: u64, epoch: u64) {
        let mut state = self.inner.state.lock();
        if state.load_id != load_id || state.focus_epoch != epoch {
            trace!(load_id, epoch, "Blur timer superseded");
            return;
        }
        let PageState {
            document, scanner, ..
        } = &mut *state;
        if let Some(scanner) = scanner {
            scanner.on_blur_settled(&*document);
        }
    }
}

// ============================================================================
// SandboxedSurface
// ============================================================================

#[async_trait]
impl SandboxedSurface for SandboxPage {
    async fn inject_scanner(&self) -> Result<()> {
        self.install_scanner();
        Ok(())
    }

    async fn post_message(&self, message: &InboundMessage) -> Result<()> {
        let value = message.to_value()?;
        self.post_value(&value);
        Ok(())
    }

    fn bounding_rect(&self) -> Geometry {
        *self.inner.bounds.lock()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::protocol::{Credential, OutboundMessage};
    use crate::scanner::dom::InputSpec;
    use crate::test_support::init_tracing;
    use crate::transport::{OutboundReceiver, outbound_channel};

    fn login_document() -> (MemoryDocument, FieldId, FieldId) {
        let mut doc = MemoryDocument::new("https://example.com/login");
        let form = doc.add_form();
        let user = doc.add_input(
            InputSpec::text()
                .name("user_email")
                .rect(Geometry::new(100.0, 20.0, 240.0, 30.0)),
            Some(form),
        );
        let pw = doc.add_input(
            InputSpec::password()
                .name("pw")
                .rect(Geometry::new(140.0, 20.0, 240.0, 30.0)),
            Some(form),
        );
        (doc, user, pw)
    }

    fn page() -> (SandboxPage, OutboundReceiver, FieldId, FieldId) {
        init_tracing();
        let (doc, user, pw) = login_document();
        let (tx, rx) = outbound_channel();
        let page = SandboxPage::new(
            doc,
            tx,
            ScannerOptions::default(),
            Geometry::new(0.0, 0.0, 1024.0, 768.0),
        );
        (page, rx, user, pw)
    }

    fn credentials() -> InboundMessage {
        InboundMessage::Credentials(vec![Credential::new(
            "https://example.com",
            "a@x.com",
            "s3cr3t",
        )])
    }

    fn count_requests(messages: &[OutboundMessage]) -> usize {
        messages
            .iter()
            .filter(|m| matches!(m, OutboundMessage::RequestCredentials { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_injection_runs_one_scanner() {
        let (page, mut rx, _, pw) = page();

        assert!(page.install_scanner());
        page.inject_scanner().await.expect("inject");
        page.set_ready();
        page.inject_scanner().await.expect("inject");

        assert_eq!(page.scan_count(), 1);
        page.post_message(&credentials()).await.expect("post");
        page.focus(pw);

        let messages = rx.drain();
        assert_eq!(count_requests(&messages), 1);
        assert_eq!(
            messages
                .iter()
                .filter(|m| matches!(m, OutboundMessage::ShowPopup(_)))
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_injection_into_ready_document_scans_immediately() {
        let (page, mut rx, _, _) = page();
        page.set_ready();
        page.install_scanner();

        assert_eq!(count_requests(&rx.drain()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_focus_events_one_request() {
        let (page, mut rx, user, pw) = page();
        page.install_scanner();
        page.set_ready();

        for _ in 0..10 {
            page.focus(pw);
            page.blur();
            page.focus(user);
        }
        sleep(Duration::from_secs(1)).await;

        assert_eq!(count_requests(&rx.drain()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_burst_is_throttled() {
        let (page, _rx, _, _) = page();
        page.install_scanner();
        page.set_ready();
        assert_eq!(page.scan_count(), 1);

        for i in 0..20 {
            page.mutate(|doc| doc.add_input(InputSpec::text().name(format!("extra{i}")), None));
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(page.scan_count(), 1);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(page.scan_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_password_field_triggers_request() {
        let mut doc = MemoryDocument::new("https://app.example.com/");
        doc.add_input(InputSpec::text().name("search"), None);
        let (tx, mut rx) = outbound_channel();
        let page = SandboxPage::new(
            doc,
            tx,
            ScannerOptions::default(),
            Geometry::default(),
        );
        page.install_scanner();
        page.set_ready();
        assert!(rx.drain().is_empty());

        sleep(Duration::from_secs(1)).await;
        page.mutate(|doc| doc.add_input(InputSpec::password(), None));

        assert_eq!(count_requests(&rx.drain()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_grace_tolerates_focus_move() {
        let (page, mut rx, user, pw) = page();
        page.install_scanner();
        page.set_ready();
        page.post_message(&credentials()).await.expect("post");
        page.focus(user);
        rx.drain();

        page.blur();
        sleep(Duration::from_millis(50)).await;
        page.focus(pw);
        sleep(Duration::from_millis(200)).await;
        assert!(
            !rx.drain()
                .iter()
                .any(|m| matches!(m, OutboundMessage::HidePopup))
        );

        page.blur();
        sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.drain(), vec![OutboundMessage::HidePopup]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refocus_restarts_blur_grace() {
        let (page, mut rx, user, pw) = page();
        page.install_scanner();
        page.set_ready();
        page.post_message(&credentials()).await.expect("post");
        page.focus(user);
        rx.drain();

        page.blur();
        sleep(Duration::from_millis(100)).await;
        page.focus(pw);
        page.blur();

        sleep(Duration::from_millis(60)).await;
        assert!(
            !rx.drain()
                .iter()
                .any(|m| matches!(m, OutboundMessage::HidePopup)),
            "first blur timer must not hide the popup early"
        );

        sleep(Duration::from_millis(100)).await;
        assert!(
            rx.drain()
                .iter()
                .any(|m| matches!(m, OutboundMessage::HidePopup))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_drops_old_realm() {
        let (page, mut rx, _, _) = page();
        page.install_scanner();
        page.set_ready();
        rx.drain();

        let (doc, _, _) = login_document();
        page.load(doc);
        assert!(!page.is_scanner_active());
        assert!(!page.post_value(&credentials().to_value().expect("value")));

        page.install_scanner();
        page.set_ready();
        assert_eq!(count_requests(&rx.drain()), 1);
    }

    #[tokio::test]
    async fn test_foreign_messages_ignored() {
        let (page, _rx, _, _) = page();
        page.install_scanner();
        assert!(!page.post_value(&serde_json::json!({"type": "resize", "payload": 3})));
    }
}
