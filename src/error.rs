//! Error types for the autofill protocol.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use tabshell_autofill::{Result, TabId};
//!
//! async fn example(coordinator: &HostCoordinator, tab_id: TabId) -> Result<()> {
//!     coordinator.on_navigation_start(tab_id).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidUrl`] |
//! | Credential store | [`Error::Store`], [`Error::Timeout`] |
//! | Tabs | [`Error::TabNotFound`], [`Error::Surface`] |
//! | External | [`Error::Json`], [`Error::ChannelClosed`] |
//!
//! None of these are fatal to the host process. The coordinator's reactive
//! handlers log and swallow them; they surface only from explicit API calls.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::TabId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when coordinator or scanner options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed bridge message.
    ///
    /// Returned by the wire codecs; the coordinator logs and drops these.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ========================================================================
    // Credential Store Errors
    // ========================================================================
    /// Credential store lookup failed.
    #[error("Credential store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Tab Errors
    // ========================================================================
    /// Tab not attached to the coordinator.
    #[error("Tab not found: {tab_id}")]
    TabNotFound {
        /// The missing tab ID.
        tab_id: TabId,
    },

    /// Sandboxed surface refused or failed a script execution.
    #[error("Surface error: {message}")]
    Surface {
        /// Error message from the surface.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bridge channel closed.
    #[error("Channel closed")]
    ChannelClosed,
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a credential store error.
    #[inline]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a tab not found error.
    #[inline]
    pub fn tab_not_found(tab_id: TabId) -> Self {
        Self::TabNotFound { tab_id }
    }

    /// Creates a surface error.
    #[inline]
    pub fn surface(message: impl Into<String>) -> Self {
        Self::Surface {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the error came from a malformed bridge message.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::Json(_) | Self::InvalidUrl(_)
        )
    }

    /// Returns `true` if the credential lookup failed.
    ///
    /// A failed lookup degrades to "no suggestions shown".
    #[inline]
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
