//! What the host can do to a sandboxed surface.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Geometry, InboundMessage};

// ============================================================================
// SandboxedSurface
// ============================================================================

/// Host-side handle to one sandboxed rendering surface.
///
/// The host never reads page state through this trait; it can only run the
/// scanner, post inbound messages and ask where the surface sits in the
/// host window.
#[async_trait]
pub trait SandboxedSurface: Send + Sync {
    /// Injects the field scanner into the current page.
    ///
    /// Safe to call repeatedly: the page-side marker makes every call after
    /// the first a no-op until the page context is replaced.
    async fn inject_scanner(&self) -> Result<()>;

    /// Delivers an inbound message to the page's messaging surface.
    async fn post_message(&self, message: &InboundMessage) -> Result<()>;

    /// Bounding rectangle of the surface in host-window coordinates.
    fn bounding_rect(&self) -> Geometry;
}
