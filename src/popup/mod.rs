//! Host-side suggestion popup.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `placement` | Pure placement and clamping |
//! | `presenter` | Renderer seam and per-tab popup tracking |

// ============================================================================
// Submodules
// ============================================================================

/// Pure placement and clamping.
pub mod placement;

/// Renderer seam and per-tab popup tracking.
pub mod presenter;

// ============================================================================
// Re-exports
// ============================================================================

pub use placement::{place_popup, row_at};
pub use presenter::{PopupEvent, PopupPresenter, PopupRenderer, RecordingRenderer, SuggestionLabel};
