//! Popup rendering and pointer-down selection.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::identifiers::TabId;
use crate::options::PopupStyle;
use crate::protocol::{Geometry, Size, SuggestionSummary};

use super::placement::{place_popup, row_at};

// ============================================================================
// SuggestionLabel
// ============================================================================

/// One popup row as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionLabel {
    /// Account name.
    pub username: String,
    /// Site host.
    pub hostname: String,
}

impl From<&SuggestionSummary> for SuggestionLabel {
    fn from(summary: &SuggestionSummary) -> Self {
        Self {
            username: summary.username.clone(),
            hostname: summary.display_host(),
        }
    }
}

// ============================================================================
// PopupRenderer
// ============================================================================

/// Host UI toolkit binding that draws the popup.
pub trait PopupRenderer: Send + Sync {
    /// Draws (or redraws) the popup for a tab at `placement`, in host-window
    /// coordinates.
    fn render(&self, tab_id: TabId, placement: &Geometry, entries: &[SuggestionLabel]);

    /// Removes the tab's popup. Called only when one is shown.
    fn hide(&self, tab_id: TabId);
}

// ============================================================================
// PopupPresenter
// ============================================================================

/// A popup currently on screen.
#[derive(Debug, Clone)]
struct Visible {
    placement: Geometry,
    entries: Vec<SuggestionSummary>,
}

/// Places and tracks one popup per tab.
pub struct PopupPresenter {
    renderer: Arc<dyn PopupRenderer>,
    style: PopupStyle,
    window: Mutex<Size>,
    visible: Mutex<FxHashMap<TabId, Visible>>,
}

impl PopupPresenter {
    /// Creates a presenter drawing through `renderer`.
    #[must_use]
    pub fn new(renderer: Arc<dyn PopupRenderer>, style: PopupStyle, window: Size) -> Self {
        Self {
            renderer,
            style,
            window: Mutex::new(window),
            visible: Mutex::new(FxHashMap::default()),
        }
    }

    /// Updates the host window size used for clamping.
    pub fn set_window_size(&self, window: Size) {
        *self.window.lock() = window;
    }

    /// Current host window size.
    #[inline]
    #[must_use]
    pub fn window_size(&self) -> Size {
        *self.window.lock()
    }

    /// Shows the popup for `tab_id`, replacing any popup it already has.
    ///
    /// `field` is surface-local; `surface` is the surface's rectangle in the
    /// host window. Returns the final placement.
    pub fn show(
        &self,
        tab_id: TabId,
        surface: &Geometry,
        field: Geometry,
        entries: Vec<SuggestionSummary>,
    ) -> Geometry {
        let anchor = field.translate(surface);
        let placement = place_popup(anchor, entries.len(), &self.style, self.window_size());
        let labels: Vec<SuggestionLabel> = entries.iter().map(SuggestionLabel::from).collect();

        debug!(%tab_id, entries = labels.len(), top = placement.top, left = placement.left, "Rendering popup");
        self.renderer.render(tab_id, &placement, &labels);
        self.visible
            .lock()
            .insert(tab_id, Visible { placement, entries });
        placement
    }

    /// Hides the tab's popup. Returns `false` if none was shown.
    pub fn hide(&self, tab_id: TabId) -> bool {
        if self.visible.lock().remove(&tab_id).is_none() {
            return false;
        }
        trace!(%tab_id, "Hiding popup");
        self.renderer.hide(tab_id);
        true
    }

    /// Returns `true` if the tab has a popup on screen.
    #[must_use]
    pub fn is_visible(&self, tab_id: TabId) -> bool {
        self.visible.lock().contains_key(&tab_id)
    }

    /// Current placement of the tab's popup.
    #[must_use]
    pub fn placement(&self, tab_id: TabId) -> Option<Geometry> {
        self.visible.lock().get(&tab_id).map(|v| v.placement)
    }

    /// Resolves a pointer-down on entry `index`.
    ///
    /// Selection happens on pointer-down so it is captured before the field
    /// blur hides the popup.
    #[must_use]
    pub fn pointer_down(&self, tab_id: TabId, index: usize) -> Option<SuggestionSummary> {
        self.visible
            .lock()
            .get(&tab_id)
            .and_then(|v| v.entries.get(index).cloned())
    }

    /// Maps a host-window pointer position to a popup entry index.
    #[must_use]
    pub fn entry_at(&self, tab_id: TabId, x: f64, y: f64) -> Option<usize> {
        let visible = self.visible.lock();
        let popup = visible.get(&tab_id)?;
        row_at(&popup.placement, popup.entries.len(), self.style.row_height, x, y)
    }
}

// ============================================================================
// RecordingRenderer
// ============================================================================

/// A renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupEvent {
    /// [`PopupRenderer::render`].
    Rendered {
        /// Tab the popup belongs to.
        tab_id: TabId,
        /// Host-window rectangle.
        placement: Geometry,
        /// Rows drawn.
        entries: Vec<SuggestionLabel>,
    },
    /// [`PopupRenderer::hide`].
    Hidden {
        /// Tab the popup belonged to.
        tab_id: TabId,
    },
}

/// Headless renderer that records every call.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: Mutex<Vec<PopupEvent>>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far.
    #[must_use]
    pub fn events(&self) -> Vec<PopupEvent> {
        self.events.lock().clone()
    }

    /// Number of `render` calls.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, PopupEvent::Rendered { .. }))
            .count()
    }

    /// Most recent event, if any.
    #[must_use]
    pub fn last(&self) -> Option<PopupEvent> {
        self.events.lock().last().cloned()
    }
}

impl PopupRenderer for RecordingRenderer {
    fn render(&self, tab_id: TabId, placement: &Geometry, entries: &[SuggestionLabel]) {
        self.events.lock().push(PopupEvent::Rendered {
            tab_id,
            placement: *placement,
            entries: entries.to_vec(),
        });
    }

    fn hide(&self, tab_id: TabId) {
        self.events.lock().push(PopupEvent::Hidden { tab_id });
    }
}

// ============================================================================
// Tests
// ============================================================================
