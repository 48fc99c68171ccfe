//! Inbound messages: host → sandboxed page.
//!
//! The host cannot call into the sandboxed context. It re-executes a small
//! fragment there that posts a structured message onto the page's own
//! messaging surface. The scanner listens for exactly two tags.
//!
//! # Format
//!
//! ```json
//! { "type": "CREDENTIALS", "payload": [ { "id": "…", "url": "…", "username": "…", "secret": "…" } ] }
//! { "type": "FILL", "payload": { "id": "…", "url": "…", "username": "…", "secret": "…" } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::credential::Credential;

// ============================================================================
// InboundMessage
// ============================================================================

/// A message from the host to the sandboxed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    /// Lookup result for the page's request.
    Credentials(Vec<Credential>),

    /// Commit the chosen credential into the form.
    Fill(Credential),
}

impl InboundMessage {
    /// Wire tag of the message.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "CREDENTIALS",
            Self::Fill(_) => "FILL",
        }
    }

    /// Converts the message to the structured value that gets posted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Accepts a value observed on the page's messaging surface.
    ///
    /// Returns `None` for anything that is not one of our two tags with a
    /// well-formed payload. Pages post their own messages on the same
    /// surface, so this is not an error.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("type").and_then(Value::as_str) {
            Some("CREDENTIALS" | "FILL") => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
