//! Privileged host side of the autofill protocol.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `session` | Per-tab session state machine |
//! | `store` | Credential store seam |
//! | `coordinator` | Tab registry, dispatch and lookups |
//! | `builder` | Coordinator builder |

// ============================================================================
// Submodules
// ============================================================================

/// Coordinator builder.
pub mod builder;

/// Tab registry, dispatch and lookups.
pub mod coordinator;

/// Per-tab session state machine.
pub mod session;

/// Credential store seam.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{CoordinatorBuilder, DEFAULT_WINDOW_SIZE};
pub use coordinator::HostCoordinator;
pub use session::{PopupRefusal, Session, SessionState};
pub use store::{CredentialStore, MemoryStore};
