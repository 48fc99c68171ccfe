//! Tabshell autofill - cross-context credential autofill for sandboxed tabs.
//!
//! A browser shell hosts untrusted pages in sandboxed surfaces. This crate
//! lets the privileged host detect login forms inside such a page, look up
//! stored credentials, show a selection popup over the surface and fill the
//! chosen credential, without the page ever touching the store.
//!
//! # Architecture
//!
//! - **Sandboxed side**: a [`FieldScanner`] watches the page, writes tagged
//!   text lines (`REQUEST_CREDENTIALS`, `SHOW_POPUP`, `HIDE_POPUP`)
//! - **Host side**: the [`HostCoordinator`] reads those lines, keeps one
//!   [`Session`] per tab and answers with structured `CREDENTIALS` and
//!   `FILL` messages
//!
//! Key design principles:
//!
//! - Every navigation starts a new session generation; late lookup results
//!   for an older generation are dropped
//! - Injection is idempotent per page context
//! - A filled session never shows the popup again
//! - The host only ever fills credentials it delivered itself
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tabshell_autofill::{
//!     Credential, Geometry, HostCoordinator, InputSpec, MemoryDocument, MemoryStore,
//!     RecordingRenderer, Result, SandboxPage, ScannerOptions, Size, TabId, outbound_channel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = MemoryStore::with_credentials([Credential::new(
//!         "https://example.com",
//!         "a@x.com",
//!         "s3cr3t",
//!     )])?;
//!
//!     let coordinator = HostCoordinator::builder()
//!         .store(Arc::new(store))
//!         .renderer(Arc::new(RecordingRenderer::new()))
//!         .window_size(Size::new(1280.0, 800.0))
//!         .build()?;
//!
//!     let mut document = MemoryDocument::new("https://example.com/login");
//!     let form = document.add_form();
//!     document.add_input(InputSpec::text().name("user_email"), Some(form));
//!     let password = document.add_input(InputSpec::password().name("pw"), Some(form));
//!
//!     let (outbound, lines) = outbound_channel();
//!     let page = SandboxPage::new(
//!         document,
//!         outbound,
//!         ScannerOptions::default(),
//!         Geometry::new(80.0, 0.0, 1280.0, 720.0),
//!     );
//!
//!     let tab = TabId::new(1).expect("non-zero");
//!     coordinator.attach_tab(tab, Arc::new(page.clone()), lines)?;
//!     coordinator.on_navigation_start(tab).await?;
//!     page.set_ready();
//!     page.focus(password);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`options`] | Timing and popup configuration |
//! | [`protocol`] | Wire schema shared by both directions |
//! | [`transport`] | Outbound line channel and sandboxed surfaces |
//! | [`scanner`] | Page-side field scanner |
//! | [`popup`] | Popup placement and rendering |
//! | [`host`] | Coordinator, sessions and credential store |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Privileged host side.
///
/// Use [`HostCoordinator::builder()`] to create a coordinator.
pub mod host;

/// Type-safe identifiers.
pub mod identifiers;

/// Timing and popup configuration.
pub mod options;

/// Suggestion popup placement and rendering.
pub mod popup;

/// Bridge message types.
///
/// One schema for both the outbound line codec and inbound JSON delivery.
pub mod protocol;

/// Page-side field scanner and the in-process sandboxed page.
pub mod scanner;

/// Bridge transport.
pub mod transport;

#[cfg(test)]
mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{
    CoordinatorBuilder, CredentialStore, HostCoordinator, MemoryStore, PopupRefusal, Session,
    SessionState,
};

// Identifier types
pub use identifiers::{CredentialId, FieldId, FormId, Generation, TabId};

// Options
pub use options::{AutofillOptions, PopupStyle, ScannerOptions};

// Popup types
pub use popup::{PopupEvent, PopupPresenter, PopupRenderer, RecordingRenderer, SuggestionLabel};

// Protocol types
pub use protocol::{
    Credential, Geometry, InboundMessage, OutboundMessage, OutboundTag, Secret, ShowPopupPayload,
    Size, SuggestionSummary,
};

// Scanner types
pub use scanner::{Dom, FieldScanner, InputSpec, MemoryDocument, SandboxPage};

// Transport types
pub use transport::{
    OutboundChannel, OutboundReceiver, SandboxedSurface, ScriptExecutor, ScriptSurface,
    outbound_channel,
};
