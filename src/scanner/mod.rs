//! Page-side field scanner.
//!
//! Everything in this module runs inside the untrusted page context. It
//! finds login fields, asks the host for credentials once, reports focus
//! geometry and fills fields when told to.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dom` | Document abstraction and in-memory document |
//! | `detect` | Password and username field detection |
//! | `throttle` | Re-scan coalescing |
//! | `core` | Per-page scanner state machine |
//! | `page` | In-process sandboxed page context |

// ============================================================================
// Submodules
// ============================================================================

/// Per-page scanner state machine.
pub mod core;

/// Password and username field detection.
pub mod detect;

/// Document abstraction.
pub mod dom;

/// In-process sandboxed page context.
pub mod page;

/// Re-scan coalescing.
pub mod throttle;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::FieldScanner;
pub use detect::{Detection, FieldRecord, FieldRole, LoginPair, MatchedAttribute};
pub use dom::{Dom, InputKind, InputSnapshot, InputSpec, MemoryDocument};
pub use page::SandboxPage;
pub use throttle::{RescanThrottle, Trigger};
