//! Bridge message schema shared by both directions.
//!
//! The sandboxed page and the host talk over two independent one-way
//! channels. The schema is defined here once; [`crate::transport`] moves it.
//!
//! | Message | Direction | Encoding |
//! |---------|-----------|----------|
//! | [`OutboundMessage`] | Page → Host | Marked text line |
//! | [`InboundMessage`] | Host → Page | Structured `{type, payload}` value |
//!
//! Messages are ordered within a channel, never across them. Pairing a
//! response with its request is the host's job, via session generation.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `credential` | Credential, redacted secret, popup summary |
//! | `geometry` | Rectangles and window size |
//! | `inbound` | Host → page messages |
//! | `outbound` | Page → host messages and line codec |

// ============================================================================
// Submodules
// ============================================================================

/// Credential records.
pub mod credential;

/// Rectangles and coordinate translation.
pub mod geometry;

/// Host → page messages.
pub mod inbound;

/// Page → host messages.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use credential::{Credential, Secret, SuggestionSummary};
pub use geometry::{Geometry, Size};
pub use inbound::InboundMessage;
pub use outbound::{LINE_MARKER, OutboundMessage, OutboundTag, ShowPopupPayload};
