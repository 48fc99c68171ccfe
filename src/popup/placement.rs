//! Pure popup placement.
//!
//! The anchor arrives already translated into host-window coordinates. The
//! popup goes under the field, flips above it when it does not fit below,
//! and is finally clamped fully inside the window.

// ============================================================================
// Imports
// ============================================================================

use crate::options::PopupStyle;
use crate::protocol::{Geometry, Size};

// ============================================================================
// Placement
// ============================================================================

/// Computes the popup rectangle for `entries` suggestions anchored at
/// `anchor`.
///
/// The result always satisfies `result.is_within(&window.bounds())`, even
/// for degenerate input (non-finite anchors, zero-sized windows).
#[must_use]
pub fn place_popup(anchor: Geometry, entries: usize, style: &PopupStyle, window: Size) -> Geometry {
    let window_width = sanitize(window.width);
    let window_height = sanitize(window.height);

    let anchor = Geometry::new(
        finite_or_zero(anchor.top),
        finite_or_zero(anchor.left),
        sanitize(anchor.width),
        sanitize(anchor.height),
    );

    let rows = entries.clamp(1, style.max_rows.max(1)) as f64;
    let height = (rows * sanitize(style.row_height)).min(window_height);
    let width = anchor.width.max(sanitize(style.min_width)).min(window_width);

    let below = anchor.bottom();
    let above = anchor.top - height;
    let top = if below + height > window_height && above >= 0.0 {
        above
    } else {
        below
    };

    Geometry::new(
        clamp_span(top, height, window_height),
        clamp_span(anchor.left, width, window_width),
        width,
        height,
    )
}

/// Maps a pointer position to a row index inside a placed popup.
#[must_use]
pub fn row_at(placement: &Geometry, entries: usize, row_height: f64, x: f64, y: f64) -> Option<usize> {
    if !(x >= placement.left && x < placement.right() && y >= placement.top && y < placement.bottom()) {
        return None;
    }
    if !(row_height.is_finite() && row_height > 0.0) {
        return None;
    }
    let index = ((y - placement.top) / row_height) as usize;
    (index < entries).then_some(index)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Non-finite becomes zero.
#[inline]
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Non-finite or negative becomes zero.
#[inline]
fn sanitize(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}

/// Moves a span of `len` starting at `start` into `[0, limit]`.
/// `len` must not exceed `limit`.
#[inline]
fn clamp_span(start: f64, len: f64, limit: f64) -> f64 {
    start.min(limit - len).max(0.0)
}

// ============================================================================
// Tests
// ============================================================================
