//! Bridge transport between the host and a sandboxed page.
//!
//! The two directions use different mechanisms:
//! the page can only write text lines the host observes, and the host can
//! only evaluate script inside the page.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   tagged text lines       ┌─────────────────┐
//! │  Sandboxed page │──────────────────────────►│  Host           │
//! │                 │                           │                 │
//! │  FieldScanner   │   postMessage(JSON)       │  Coordinator    │
//! │                 │◄──────────────────────────│                 │
//! └─────────────────┘   via script execution    └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Outbound line channel |
//! | `surface` | Host's view of a sandboxed surface |
//! | `script` | Surface backed by a script executor |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound line channel.
pub mod channel;

/// Surface backed by a script executor.
pub mod script;

/// Host's view of a sandboxed surface.
pub mod surface;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{OutboundChannel, OutboundReceiver, decode_line, outbound_channel};
pub use script::{INJECTION_MARKER, ScriptExecutor, ScriptSurface};
pub use surface::SandboxedSurface;
