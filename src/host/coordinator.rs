//! Host-side protocol coordinator.
//!
//! The coordinator owns one [`Session`] per attached tab, reads each tab's
//! outbound lines on a dedicated pump task, runs credential lookups off the
//! pump and drives the popup.
//!
//! # Example
//!
//! ```ignore
//! let coordinator = HostCoordinator::builder()
//!     .store(store)
//!     .renderer(renderer)
//!     .window_size(Size::new(1280.0, 800.0))
//!     .build()?;
//!
//! coordinator.attach_tab(tab_id, surface, outbound_rx)?;
//! coordinator.on_navigation_start(tab_id).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{Generation, TabId};
use crate::options::AutofillOptions;
use crate::popup::{PopupPresenter, PopupRenderer};
use crate::protocol::{Credential, InboundMessage, OutboundMessage, ShowPopupPayload, Size};
use crate::transport::{OutboundReceiver, SandboxedSurface, decode_line};

use super::builder::CoordinatorBuilder;
use super::session::{PopupRefusal, Session, host_matches};
use super::store::CredentialStore;

// ============================================================================
// Types
// ============================================================================

/// Stops a tab's pump task.
struct PumpHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Everything the coordinator keeps per tab.
struct TabEntry {
    surface: Arc<dyn SandboxedSurface>,
    session: Mutex<Session>,
    /// Held across every post into the page and across navigation resets,
    /// so nothing checked against one generation lands in the next.
    delivery: AsyncMutex<()>,
    pump: Mutex<Option<PumpHandle>>,
}

impl TabEntry {
    fn generation(&self) -> Generation {
        self.session.lock().generation()
    }

    /// Resets the session and hides its popup in one critical section.
    fn reset(&self, presenter: &PopupPresenter, tab_id: TabId) -> Generation {
        let mut session = self.session.lock();
        let generation = session.reset();
        presenter.hide(tab_id);
        generation
    }

    fn stop_pump(&self) -> Option<JoinHandle<()>> {
        let handle = self.pump.lock().take()?;
        let _ = handle.shutdown_tx.send(());
        Some(handle.task)
    }
}

struct CoordinatorInner {
    store: Arc<dyn CredentialStore>,
    presenter: PopupPresenter,
    options: AutofillOptions,
    tabs: RwLock<FxHashMap<TabId, Arc<TabEntry>>>,
}

// ============================================================================
// HostCoordinator
// ============================================================================

/// Privileged side of the autofill protocol.
///
/// Cheap to clone; clones share all tabs.
#[derive(Clone)]
pub struct HostCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl fmt::Debug for HostCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCoordinator")
            .field("tabs", &self.inner.tabs.read().len())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl HostCoordinator {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    pub(crate) fn new(
        store: Arc<dyn CredentialStore>,
        renderer: Arc<dyn PopupRenderer>,
        options: AutofillOptions,
        window: Size,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                presenter: PopupPresenter::new(renderer, options.popup, window),
                options,
                tabs: RwLock::new(FxHashMap::default()),
            }),
        }
    }

    /// Active options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &AutofillOptions {
        &self.inner.options
    }

    /// Updates the host window size used for popup clamping.
    pub fn set_window_size(&self, window: Size) {
        self.inner.presenter.set_window_size(window);
    }

    /// Returns a copy of a tab's session.
    #[must_use]
    pub fn session(&self, tab_id: TabId) -> Option<Session> {
        self.entry(tab_id).map(|entry| entry.session.lock().clone())
    }

    /// IDs of attached tabs.
    #[must_use]
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.inner.tabs.read().keys().copied().collect()
    }

    /// Returns `true` if the tab's popup is on screen.
    #[must_use]
    pub fn is_popup_visible(&self, tab_id: TabId) -> bool {
        self.inner.presenter.is_visible(tab_id)
    }

    fn entry(&self, tab_id: TabId) -> Option<Arc<TabEntry>> {
        self.inner.tabs.read().get(&tab_id).cloned()
    }

    fn require_entry(&self, tab_id: TabId) -> Result<Arc<TabEntry>> {
        self.entry(tab_id).ok_or_else(|| Error::tab_not_found(tab_id))
    }
}

// ============================================================================
// HostCoordinator - Tab Lifecycle
// ============================================================================

impl HostCoordinator {
    /// Attaches a tab and starts pumping its outbound lines.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Surface`] if the tab is already attached.
    pub fn attach_tab(
        &self,
        tab_id: TabId,
        surface: Arc<dyn SandboxedSurface>,
        outbound: OutboundReceiver,
    ) -> Result<()> {
        let entry = Arc::new(TabEntry {
            surface,
            session: Mutex::new(Session::new()),
            delivery: AsyncMutex::new(()),
            pump: Mutex::new(None),
        });

        {
            let mut tabs = self.inner.tabs.write();
            if tabs.contains_key(&tab_id) {
                return Err(Error::surface(format!("tab {tab_id} is already attached")));
            }
            tabs.insert(tab_id, Arc::clone(&entry));
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_pump(self.clone(), tab_id, outbound, shutdown_rx));
        *entry.pump.lock() = Some(PumpHandle { shutdown_tx, task });

        info!(%tab_id, "Tab attached");
        Ok(())
    }

    /// Detaches a tab. In-flight lookups for it are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`] if the tab is not attached.
    pub async fn detach_tab(&self, tab_id: TabId) -> Result<()> {
        let entry = self
            .inner
            .tabs
            .write()
            .remove(&tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;

        {
            let _delivery = entry.delivery.lock().await;
            entry.reset(&self.inner.presenter, tab_id);
        }

        if let Some(task) = entry.stop_pump()
            && let Err(e) = task.await
        {
            warn!(%tab_id, error = %e, "Pump task ended abnormally");
        }

        info!(%tab_id, "Tab detached");
        Ok(())
    }

    /// Detaches every tab and waits for all pumps to stop.
    pub async fn shutdown(&self) {
        let entries: Vec<(TabId, Arc<TabEntry>)> = self.inner.tabs.write().drain().collect();

        let tasks: Vec<JoinHandle<()>> = entries
            .iter()
            .filter_map(|(tab_id, entry)| {
                entry.reset(&self.inner.presenter, *tab_id);
                entry.stop_pump()
            })
            .collect();

        let count = tasks.len();
        for result in join_all(tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Pump task ended abnormally");
            }
        }
        info!(tabs = count, "Coordinator shut down");
    }
}

// ============================================================================
// HostCoordinator - Navigation
// ============================================================================

impl HostCoordinator {
    /// A navigation started: starts a new session generation, hides any
    /// popup and injects the scanner.
    ///
    /// Returns the new generation.
    ///
    /// # Errors
    ///
    /// - [`Error::TabNotFound`] if the tab is not attached
    /// - Any error the surface reports while injecting
    pub async fn on_navigation_start(&self, tab_id: TabId) -> Result<Generation> {
        let entry = self.require_entry(tab_id)?;

        let _delivery = entry.delivery.lock().await;
        let generation = entry.reset(&self.inner.presenter, tab_id);
        info!(%tab_id, %generation, "Navigation started");

        self.inject(tab_id, &entry).await?;
        Ok(generation)
    }

    /// The navigation committed to `url`. Records it and re-injects.
    ///
    /// Once recorded, credential requests for any other host are refused.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if `url` does not parse
    /// - [`Error::TabNotFound`] if the tab is not attached
    /// - Any error the surface reports while injecting
    pub async fn on_navigation_committed(&self, tab_id: TabId, url: &str) -> Result<()> {
        let url = Url::parse(url)?;
        let entry = self.require_entry(tab_id)?;

        debug!(%tab_id, url = %url, "Navigation committed");
        entry.session.lock().commit_url(url);

        self.inject(tab_id, &entry).await
    }

    /// Page content finished loading. Re-injects; the page-side marker
    /// turns this into a no-op when the scanner already runs.
    ///
    /// # Errors
    ///
    /// - [`Error::TabNotFound`] if the tab is not attached
    /// - Any error the surface reports while injecting
    pub async fn on_content_loaded(&self, tab_id: TabId) -> Result<()> {
        let entry = self.require_entry(tab_id)?;
        self.inject(tab_id, &entry).await
    }

    async fn inject(&self, tab_id: TabId, entry: &TabEntry) -> Result<()> {
        let generation = entry.generation();
        entry.surface.inject_scanner().await?;

        let mut session = entry.session.lock();
        if session.generation() == generation {
            session.mark_injected();
            trace!(%tab_id, %generation, "Scanner injected");
        }
        Ok(())
    }
}

// ============================================================================
// HostCoordinator - Outbound Dispatch
// ============================================================================

impl HostCoordinator {
    /// Handles one raw line observed on a tab's outbound channel.
    ///
    /// Foreign and malformed lines are dropped.
    pub fn handle_line(&self, tab_id: TabId, line: &str) {
        if let Some(message) = decode_line(line) {
            self.handle_message(tab_id, message);
        }
    }

    /// Handles one decoded outbound message.
    ///
    /// Never fails: every problem is logged and the message dropped.
    pub fn handle_message(&self, tab_id: TabId, message: OutboundMessage) {
        let Some(entry) = self.entry(tab_id) else {
            warn!(%tab_id, tag = message.tag().as_str(), "Message for unknown tab dropped");
            return;
        };

        match message {
            OutboundMessage::RequestCredentials { url } => self.on_request(tab_id, entry, url),
            OutboundMessage::ShowPopup(payload) => self.on_show(tab_id, &entry, payload),
            OutboundMessage::HidePopup => self.on_hide(tab_id, &entry),
        }
    }

    fn on_request(&self, tab_id: TabId, entry: Arc<TabEntry>, url: Url) {
        let generation = {
            let mut session = entry.session.lock();
            if !session.permits_request(&url) {
                warn!(%tab_id, url = %url, "Credential request for foreign host refused");
                return;
            }
            match session.begin_request() {
                Some(generation) => generation,
                None => {
                    debug!(%tab_id, url = %url, "Duplicate credential request ignored");
                    return;
                }
            }
        };

        debug!(%tab_id, %generation, url = %url, "Looking up credentials");
        let store = Arc::clone(&self.inner.store);
        let lookup_timeout = self.inner.options.lookup_timeout;
        tokio::spawn(deliver_credentials(
            store,
            entry,
            tab_id,
            generation,
            url,
            lookup_timeout,
        ));
    }

    fn on_show(&self, tab_id: TabId, entry: &TabEntry, payload: ShowPopupPayload) {
        let ShowPopupPayload {
            geometry,
            suggestions,
        } = payload;

        if !geometry.is_valid() {
            warn!(%tab_id, ?geometry, "Popup geometry rejected");
            return;
        }

        let surface = entry.surface.bounding_rect();

        // The render stays under the session lock so a navigation or fill
        // cannot slip between the check and the popup appearing.
        let mut session = entry.session.lock();
        let generation = session.generation();
        match session.open_popup(geometry, &suggestions) {
            Ok(entries) => {
                self.inner.presenter.show(tab_id, &surface, geometry, entries);
            }
            Err(PopupRefusal::Filled) => {
                error!(%tab_id, %generation, "Popup requested for a filled session");
            }
            Err(refusal) => {
                warn!(%tab_id, %generation, %refusal, "Popup request refused");
            }
        }
    }

    fn on_hide(&self, tab_id: TabId, entry: &TabEntry) {
        let mut session = entry.session.lock();
        session.close_popup();
        if self.inner.presenter.hide(tab_id) {
            debug!(%tab_id, "Popup hidden");
        }
    }
}

// ============================================================================
// HostCoordinator - Selection
// ============================================================================

impl HostCoordinator {
    /// Pointer-down on popup entry `index`: fills the matching credential.
    ///
    /// Returns `false` when there is nothing to select (no popup, index out
    /// of range, or the session is already filled).
    ///
    /// # Errors
    ///
    /// - [`Error::TabNotFound`] if the tab is not attached
    /// - Any error the surface reports while delivering the fill
    pub async fn select_suggestion(&self, tab_id: TabId, index: usize) -> Result<bool> {
        let entry = self.require_entry(tab_id)?;
        let _delivery = entry.delivery.lock().await;

        let credential = {
            let mut session = entry.session.lock();
            let Some(summary) = self.inner.presenter.pointer_down(tab_id, index) else {
                debug!(%tab_id, index, "Pointer-down outside any entry");
                return Ok(false);
            };
            let credential = session.commit_fill(&summary);
            self.inner.presenter.hide(tab_id);
            credential
        };

        let Some(credential) = credential else {
            warn!(%tab_id, index, "Selection does not match a delivered credential");
            return Ok(false);
        };

        info!(%tab_id, username = %credential.username, "Filling selected credential");
        entry
            .surface
            .post_message(&InboundMessage::Fill(credential))
            .await?;
        Ok(true)
    }

    /// Pointer-down at a host-window position.
    ///
    /// # Errors
    ///
    /// Same as [`select_suggestion`](Self::select_suggestion).
    pub async fn pointer_down_at(&self, tab_id: TabId, x: f64, y: f64) -> Result<bool> {
        match self.inner.presenter.entry_at(tab_id, x, y) {
            Some(index) => self.select_suggestion(tab_id, index).await,
            None => Ok(false),
        }
    }
}

// ============================================================================
// Background Tasks
// ============================================================================

/// Reads a tab's outbound lines until the page side closes or the tab is
/// detached.
async fn run_pump(
    coordinator: HostCoordinator,
    tab_id: TabId,
    mut outbound: OutboundReceiver,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            line = outbound.recv_line() => {
                match line {
                    Some(line) => coordinator.handle_line(tab_id, &line),
                    None => {
                        debug!(%tab_id, "Outbound channel closed");
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!(%tab_id, "Pump shutdown requested");
                break;
            }
        }
    }

    trace!(%tab_id, "Pump terminated");
}

/// Runs one lookup and delivers the result if the session has not moved on.
async fn deliver_credentials(
    store: Arc<dyn CredentialStore>,
    entry: Arc<TabEntry>,
    tab_id: TabId,
    generation: Generation,
    url: Url,
    lookup_timeout: Option<Duration>,
) {
    let result = match lookup_timeout {
        Some(limit) => match timeout(limit, store.get_for_url(&url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(
                "credential lookup",
                limit.as_millis() as u64,
            )),
        },
        None => store.get_for_url(&url).await,
    };

    let credentials: Vec<Credential> = match result {
        Ok(found) => found.into_iter().filter(|c| host_matches(c, &url)).collect(),
        Err(e) => {
            warn!(%tab_id, %generation, url = %url, error = %e, "Credential lookup failed");
            return;
        }
    };

    let _delivery = entry.delivery.lock().await;
    let accepted = entry
        .session
        .lock()
        .accept_credentials(generation, credentials.clone());
    if !accepted {
        debug!(%tab_id, %generation, "Stale lookup result discarded");
        return;
    }

    debug!(%tab_id, %generation, count = credentials.len(), "Delivering credentials");
    if let Err(e) = entry
        .surface
        .post_message(&InboundMessage::Credentials(credentials))
        .await
    {
        warn!(%tab_id, %generation, error = %e, "Credential delivery failed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures_util::FutureExt;
    use tokio::time::sleep;

    use super::*;
    use crate::host::MemoryStore;
    use crate::host::session::SessionState;
    use crate::identifiers::FieldId;
    use crate::popup::{PopupEvent, RecordingRenderer};
    use crate::options::ScannerOptions;
    use crate::protocol::{Geometry, SuggestionSummary};
    use crate::scanner::{InputSpec, MemoryDocument, SandboxPage};
    use crate::test_support::init_tracing;
    use crate::transport::outbound_channel;

    const SURFACE: Geometry = Geometry::new(80.0, 0.0, 1024.0, 688.0);

    /// Counts lookups and optionally delays or fails them.
    struct ScriptedStore {
        inner: MemoryStore,
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl ScriptedStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::with_credentials([Credential::new(
                    "https://example.com",
                    "a@x.com",
                    "s3cr3t",
                )])
                .expect("store"),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn delayed(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CredentialStore for ScriptedStore {
        async fn get_for_url(&self, url: &Url) -> Result<Vec<Credential>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.fail {
                return Err(Error::store("vault locked"));
            }
            self.inner.get_for_url(url).await
        }
    }

    struct Harness {
        coordinator: HostCoordinator,
        renderer: Arc<RecordingRenderer>,
        store: Arc<ScriptedStore>,
        page: SandboxPage,
        tab: TabId,
        user: FieldId,
        pw: FieldId,
    }

    fn login_document() -> (MemoryDocument, FieldId, FieldId) {
        let mut doc = MemoryDocument::new("https://example.com/login");
        let form = doc.add_form();
        let pw = doc.add_input(
            InputSpec::password()
                .name("pw")
                .rect(Geometry::new(160.0, 40.0, 240.0, 30.0)),
            Some(form),
        );
        let user = doc.add_input(
            InputSpec::text()
                .name("user_email")
                .rect(Geometry::new(120.0, 40.0, 240.0, 30.0)),
            Some(form),
        );
        (doc, user, pw)
    }

    fn harness_with(store: ScriptedStore, options: AutofillOptions) -> Harness {
        init_tracing();
        let store = Arc::new(store);
        let renderer = Arc::new(RecordingRenderer::new());
        let coordinator = HostCoordinator::builder()
            .store(store.clone())
            .renderer(renderer.clone())
            .options(options.clone())
            .window_size(Size::new(1024.0, 768.0))
            .build()
            .expect("coordinator");

        let (doc, user, pw) = login_document();
        let (tx, rx) = outbound_channel();
        let page = SandboxPage::new(doc, tx, options.scanner, SURFACE);
        let tab = TabId::new(7).expect("non-zero");
        coordinator
            .attach_tab(tab, Arc::new(page.clone()), rx)
            .expect("attach");

        Harness {
            coordinator,
            renderer,
            store,
            page,
            tab,
            user,
            pw,
        }
    }

    fn harness() -> Harness {
        harness_with(ScriptedStore::new(), AutofillOptions::default())
    }

    /// Lets every spawned task run until the runtime is idle.
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    fn coordinator_with(store: ScriptedStore) -> (HostCoordinator, Arc<RecordingRenderer>) {
        init_tracing();
        let renderer = Arc::new(RecordingRenderer::new());
        let coordinator = HostCoordinator::builder()
            .store(Arc::new(store))
            .renderer(renderer.clone())
            .window_size(Size::new(1024.0, 768.0))
            .build()
            .expect("coordinator");
        (coordinator, renderer)
    }

    /// Wraps a page and starts a navigation the next time the host measures it.
    struct NavigatingSurface {
        page: SandboxPage,
        target: Mutex<Option<(HostCoordinator, TabId)>>,
    }

    #[async_trait]
    impl SandboxedSurface for NavigatingSurface {
        async fn inject_scanner(&self) -> Result<()> {
            self.page.inject_scanner().await
        }

        async fn post_message(&self, message: &InboundMessage) -> Result<()> {
            self.page.post_message(message).await
        }

        fn bounding_rect(&self) -> Geometry {
            if let Some((coordinator, tab)) = self.target.lock().take() {
                let navigated = coordinator.on_navigation_start(tab).now_or_never();
                assert!(matches!(navigated, Some(Ok(_))), "navigation did not complete");
            }
            self.page.bounding_rect()
        }
    }

    /// Records injections and deliveries; each delivery takes `delay`.
    struct SlowSurface {
        delay: Duration,
        log: Mutex<Vec<&'static str>>,
    }

    impl SlowSurface {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                log: Mutex::new(Vec::new()),
            }
        }

        fn log(&self) -> Vec<&'static str> {
            self.log.lock().clone()
        }
    }

    #[async_trait]
    impl SandboxedSurface for SlowSurface {
        async fn inject_scanner(&self) -> Result<()> {
            self.log.lock().push("inject");
            Ok(())
        }

        async fn post_message(&self, message: &InboundMessage) -> Result<()> {
            sleep(self.delay).await;
            self.log.lock().push(message.tag());
            Ok(())
        }

        fn bounding_rect(&self) -> Geometry {
            SURFACE
        }
    }

    impl Harness {
        fn state(&self) -> SessionState {
            self.coordinator
                .session(self.tab)
                .expect("session")
                .state()
        }

        async fn load_page(&self) {
            self.coordinator
                .on_navigation_start(self.tab)
                .await
                .expect("navigation");
            self.page.set_ready();
            settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_login_fill() {
        let h = harness();
        h.load_page().await;

        assert_eq!(h.store.calls(), 1);
        let session = h.coordinator.session(h.tab).expect("session");
        assert_eq!(session.state(), SessionState::CredentialsCached);
        assert_eq!(session.suggestions().len(), 1);

        h.page.focus(h.pw);
        settle().await;
        assert_eq!(h.state(), SessionState::PopupVisible);
        match h.renderer.last() {
            Some(PopupEvent::Rendered {
                placement, entries, ..
            }) => {
                assert_eq!(placement.top, 80.0 + 160.0 + 30.0);
                assert_eq!(placement.left, 40.0);
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].username, "a@x.com");
                assert_eq!(entries[0].hostname, "example.com");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert!(h.coordinator.select_suggestion(h.tab, 0).await.expect("select"));
        settle().await;
        assert_eq!(h.state(), SessionState::Filled);
        assert!(!h.coordinator.is_popup_visible(h.tab));
        assert!(h.page.is_filled());
        h.page.read(|doc| {
            assert_eq!(doc.value(h.user), Some("a@x.com"));
            assert_eq!(doc.value(h.pw), Some("s3cr3t"));
        });

        h.page.blur();
        h.page.focus(h.pw);
        h.page.focus(h.user);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(h.renderer.render_count(), 1);
        assert_eq!(h.store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_injection_runs_one_scanner() {
        let h = harness();
        h.coordinator
            .on_navigation_start(h.tab)
            .await
            .expect("navigation");
        h.coordinator
            .on_navigation_committed(h.tab, "https://example.com/login")
            .await
            .expect("commit");
        h.page.set_ready();
        h.coordinator
            .on_content_loaded(h.tab)
            .await
            .expect("loaded");
        settle().await;

        assert_eq!(h.page.scan_count(), 1);
        assert_eq!(h.store.calls(), 1);

        h.page.focus(h.pw);
        settle().await;
        assert_eq!(h.renderer.render_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_request_ignored() {
        let h = harness();
        h.load_page().await;

        let line = "__tabshell_autofill__:REQUEST_CREDENTIALS https://example.com/login";
        h.coordinator.handle_line(h.tab, line);
        h.coordinator.handle_line(h.tab, line);
        settle().await;

        assert_eq!(h.store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_discarded() {
        let h = harness_with(
            ScriptedStore::delayed(Duration::from_millis(100)),
            AutofillOptions::default(),
        );
        h.load_page().await;
        let first = h.coordinator.session(h.tab).expect("session").generation();

        let (doc, _, _) = login_document();
        h.page.load(doc);
        let second = h
            .coordinator
            .on_navigation_start(h.tab)
            .await
            .expect("navigation");
        assert!(second > first);

        sleep(Duration::from_millis(150)).await;
        let session = h.coordinator.session(h.tab).expect("session");
        assert_eq!(session.state(), SessionState::Injected);
        assert!(session.suggestions().is_empty());

        h.page.focus(h.pw);
        settle().await;
        assert_eq!(h.renderer.render_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_shows_nothing() {
        let h = harness_with(ScriptedStore::failing(), AutofillOptions::default());
        h.load_page().await;
        h.page.focus(h.pw);
        settle().await;

        assert_eq!(h.store.calls(), 1);
        assert_eq!(h.state(), SessionState::Injected);
        assert_eq!(h.renderer.render_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_timeout_behaves_like_failure() {
        let h = harness_with(
            ScriptedStore::delayed(Duration::from_secs(10)),
            AutofillOptions::new().with_lookup_timeout(Duration::from_secs(1)),
        );
        h.load_page().await;
        h.page.focus(h.pw);

        sleep(Duration::from_secs(20)).await;
        assert_eq!(h.state(), SessionState::Injected);
        assert_eq!(h.renderer.render_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_after_fill_refused() {
        let h = harness();
        h.load_page().await;
        h.page.focus(h.pw);
        settle().await;
        assert!(h.coordinator.select_suggestion(h.tab, 0).await.expect("select"));

        let forged = OutboundMessage::ShowPopup(ShowPopupPayload {
            geometry: Geometry::new(0.0, 0.0, 100.0, 20.0),
            suggestions: vec![
                h.coordinator.session(h.tab).expect("session").suggestions()[0].summary(),
            ],
        });
        h.coordinator.handle_message(h.tab, forged);

        assert_eq!(h.renderer.render_count(), 1);
        assert!(!h.coordinator.is_popup_visible(h.tab));
        assert!(!h.coordinator.select_suggestion(h.tab, 0).await.expect("select"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_host_request_refused() {
        let h = harness();
        h.coordinator
            .on_navigation_committed(h.tab, "https://example.com/")
            .await
            .expect("commit");

        h.coordinator.handle_line(
            h.tab,
            "__tabshell_autofill__:REQUEST_CREDENTIALS https://bank.test/login",
        );
        settle().await;
        assert_eq!(h.store.calls(), 0);

        h.page.set_ready();
        settle().await;
        assert_eq!(h.store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_hides_popup_after_grace() {
        let h = harness();
        h.load_page().await;
        h.page.focus(h.pw);
        settle().await;
        assert!(h.coordinator.is_popup_visible(h.tab));

        h.page.blur();
        sleep(Duration::from_millis(100)).await;
        assert!(h.coordinator.is_popup_visible(h.tab));

        sleep(Duration::from_millis(100)).await;
        assert!(!h.coordinator.is_popup_visible(h.tab));
        assert_eq!(h.state(), SessionState::CredentialsCached);
        assert_eq!(h.renderer.last(), Some(PopupEvent::Hidden { tab_id: h.tab }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_popup_clamped_to_small_window() {
        let h = harness();
        h.coordinator.set_window_size(Size::new(300.0, 250.0));
        h.load_page().await;
        h.page.focus(h.pw);
        settle().await;

        let Some(PopupEvent::Rendered { placement, .. }) = h.renderer.last() else {
            panic!("popup not rendered");
        };
        assert!(placement.is_within(&Size::new(300.0, 250.0).bounds()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_down_at_position() {
        let h = harness();
        h.load_page().await;
        h.page.focus(h.user);
        settle().await;

        assert!(!h.coordinator.pointer_down_at(h.tab, 0.0, 0.0).await.expect("miss"));
        let Some(PopupEvent::Rendered { placement, .. }) = h.renderer.last() else {
            panic!("popup not rendered");
        };
        assert!(
            h.coordinator
                .pointer_down_at(h.tab, placement.left + 5.0, placement.top + 5.0)
                .await
                .expect("hit")
        );
        settle().await;
        assert!(h.page.is_filled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_after_fill_starts_over() {
        let h = harness();
        h.load_page().await;
        h.page.focus(h.pw);
        settle().await;
        h.coordinator.select_suggestion(h.tab, 0).await.expect("select");

        let (doc, _, pw) = login_document();
        h.page.load(doc);
        h.load_page().await;
        assert_eq!(h.state(), SessionState::CredentialsCached);
        assert_eq!(h.store.calls(), 2);

        h.page.focus(pw);
        settle().await;
        assert_eq!(h.renderer.render_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_and_shutdown() {
        let h = harness();
        let other = TabId::new(8).expect("non-zero");
        let (_tx, rx) = outbound_channel();
        h.coordinator
            .attach_tab(other, Arc::new(h.page.clone()), rx)
            .expect("attach");

        let (_tx2, rx2) = outbound_channel();
        assert!(
            h.coordinator
                .attach_tab(other, Arc::new(h.page.clone()), rx2)
                .is_err()
        );

        h.coordinator.detach_tab(h.tab).await.expect("detach");
        let err = h.coordinator.on_navigation_start(h.tab).await.unwrap_err();
        assert!(matches!(err, Error::TabNotFound { .. }));

        h.coordinator.shutdown().await;
        assert!(h.coordinator.tab_ids().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tab_messages_dropped() {
        let h = harness();
        let ghost = TabId::new(99).expect("non-zero");
        h.coordinator.handle_message(ghost, OutboundMessage::HidePopup);
        assert!(h.coordinator.select_suggestion(ghost, 0).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_during_show_renders_nothing() {
        let (coordinator, renderer) = coordinator_with(ScriptedStore::new());
        let (doc, _, pw) = login_document();
        let (tx, rx) = outbound_channel();
        let page = SandboxPage::new(doc, tx, ScannerOptions::default(), SURFACE);
        let surface = Arc::new(NavigatingSurface {
            page: page.clone(),
            target: Mutex::new(None),
        });
        let tab = TabId::new(9).expect("non-zero");
        coordinator
            .attach_tab(tab, surface.clone(), rx)
            .expect("attach");

        coordinator.on_navigation_start(tab).await.expect("navigation");
        page.set_ready();
        settle().await;
        let cached = coordinator.session(tab).expect("session");
        assert_eq!(cached.state(), SessionState::CredentialsCached);

        *surface.target.lock() = Some((coordinator.clone(), tab));
        page.focus(pw);
        settle().await;

        assert!(surface.target.lock().is_none());
        let session = coordinator.session(tab).expect("session");
        assert!(session.generation() > cached.generation());
        assert_eq!(session.state(), SessionState::Injected);
        assert!(!session.is_popup_visible());
        assert!(!coordinator.is_popup_visible(tab));
        assert_eq!(renderer.render_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_waits_for_inflight_delivery() {
        let (coordinator, _renderer) = coordinator_with(ScriptedStore::new());
        let surface = Arc::new(SlowSurface::new(Duration::from_millis(100)));
        let (_tx, rx) = outbound_channel();
        let tab = TabId::new(10).expect("non-zero");
        coordinator
            .attach_tab(tab, surface.clone(), rx)
            .expect("attach");

        coordinator.on_navigation_start(tab).await.expect("navigation");
        coordinator.handle_line(
            tab,
            "__tabshell_autofill__:REQUEST_CREDENTIALS https://example.com/login",
        );
        settle().await;

        let navigation = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.on_navigation_start(tab).await }
        });
        sleep(Duration::from_millis(200)).await;
        navigation
            .await
            .expect("join")
            .expect("navigation");

        assert_eq!(surface.log(), ["inject", "CREDENTIALS", "inject"]);
        let session = coordinator.session(tab).expect("session");
        assert_eq!(session.generation().as_u64(), 2);
        assert_eq!(session.state(), SessionState::Injected);
        assert!(session.suggestions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undelivered_entries_refused() {
        let h = harness();
        h.load_page().await;

        let forged = OutboundMessage::ShowPopup(ShowPopupPayload {
            geometry: Geometry::new(0.0, 0.0, 100.0, 20.0),
            suggestions: vec![SuggestionSummary {
                username: "mallory@x.com".to_string(),
                url: "https://example.com".to_string(),
            }],
        });
        h.coordinator.handle_message(h.tab, forged);

        assert_eq!(h.renderer.render_count(), 0);
        assert!(!h.coordinator.is_popup_visible(h.tab));
        assert_eq!(h.state(), SessionState::CredentialsCached);
    }
}
