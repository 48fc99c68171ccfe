//! Outbound messages: sandboxed page → host.
//!
//! The sandboxed context has no privileged API, only a text side channel
//! the host observes (console output, in a real webview). Every message is a
//! single UTF-8 line behind a reserved marker:
//!
//! | Line | Meaning |
//! |------|---------|
//! | `REQUEST_CREDENTIALS <absolute-url>` | Login fields detected |
//! | `SHOW_POPUP <json>` | Tracked field focused, suggestions cached |
//! | `HIDE_POPUP` | Focus left the tracked fields |
//!
//! # Format
//!
//! ```text
//! __tabshell_autofill__:SHOW_POPUP {"geometry":{"top":..},"suggestions":[..]}
//! ```
//!
//! Lines without the marker are ordinary console output and are not ours.
//! Lines with the marker that fail to parse are errors; callers log and
//! drop them.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

use super::credential::SuggestionSummary;
use super::geometry::Geometry;

// ============================================================================
// Constants
// ============================================================================

/// Reserved prefix of every outbound line.
pub const LINE_MARKER: &str = "__tabshell_autofill__:";

// ============================================================================
// OutboundTag
// ============================================================================

/// Fixed tag vocabulary of the outbound channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundTag {
    /// `REQUEST_CREDENTIALS`
    RequestCredentials,
    /// `SHOW_POPUP`
    ShowPopup,
    /// `HIDE_POPUP`
    HidePopup,
}

impl OutboundTag {
    /// Wire spelling of the tag.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCredentials => "REQUEST_CREDENTIALS",
            Self::ShowPopup => "SHOW_POPUP",
            Self::HidePopup => "HIDE_POPUP",
        }
    }

    /// Looks up a tag by its wire spelling.
    #[must_use]
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "REQUEST_CREDENTIALS" => Some(Self::RequestCredentials),
            "SHOW_POPUP" => Some(Self::ShowPopup),
            "HIDE_POPUP" => Some(Self::HidePopup),
            _ => None,
        }
    }
}

// ============================================================================
// ShowPopupPayload
// ============================================================================

/// JSON argument of `SHOW_POPUP`.
///
/// # Format
///
/// ```json
/// {
///   "geometry": { "top": 0, "left": 0, "width": 0, "height": 0 },
///   "suggestions": [ { "username": "a@x.com", "url": "https://example.com" } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowPopupPayload {
    /// Focused field rectangle, surface-local.
    pub geometry: Geometry,

    /// Entries to list.
    pub suggestions: Vec<SuggestionSummary>,
}

// ============================================================================
// OutboundMessage
// ============================================================================

/// A message from the sandboxed page to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Ask the host for credentials matching the page.
    RequestCredentials {
        /// Absolute page URL.
        url: Url,
    },

    /// Ask the host to show the suggestion popup.
    ShowPopup(ShowPopupPayload),

    /// Ask the host to hide the popup.
    HidePopup,
}

impl OutboundMessage {
    /// Returns the wire tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> OutboundTag {
        match self {
            Self::RequestCredentials { .. } => OutboundTag::RequestCredentials,
            Self::ShowPopup(_) => OutboundTag::ShowPopup,
            Self::HidePopup => OutboundTag::HidePopup,
        }
    }

    /// Encodes the message as one marked line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the popup payload fails to serialize.
    pub fn to_line(&self) -> Result<String> {
        let tag = self.tag().as_str();
        let line = match self {
            Self::RequestCredentials { url } => format!("{LINE_MARKER}{tag} {url}"),
            Self::ShowPopup(payload) => {
                format!("{LINE_MARKER}{tag} {}", serde_json::to_string(payload)?)
            }
            Self::HidePopup => format!("{LINE_MARKER}{tag}"),
        };
        Ok(line)
    }

    /// Parses a line observed on the side channel.
    ///
    /// Returns `None` for lines that do not carry [`LINE_MARKER`].
    #[must_use]
    pub fn from_console_line(line: &str) -> Option<Result<Self>> {
        line.trim_end_matches(['\r', '\n'])
            .strip_prefix(LINE_MARKER)
            .map(Self::parse_body)
    }

    /// Parses the part of a line after the marker.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] for an unknown tag or a missing argument
    /// - [`Error::InvalidUrl`] if the request URL is not absolute
    /// - [`Error::Json`] if the popup payload is not valid JSON
    pub fn parse_body(body: &str) -> Result<Self> {
        let (tag, argument) = match body.split_once(' ') {
            Some((tag, rest)) => (tag, rest.trim()),
            None => (body.trim(), ""),
        };

        let tag = OutboundTag::from_wire(tag)
            .ok_or_else(|| Error::protocol(format!("unknown outbound tag: {tag:?}")))?;

        match tag {
            OutboundTag::RequestCredentials => {
                if argument.is_empty() {
                    return Err(Error::protocol("REQUEST_CREDENTIALS without URL"));
                }
                Ok(Self::RequestCredentials {
                    url: Url::parse(argument)?,
                })
            }
            OutboundTag::ShowPopup => {
                if argument.is_empty() {
                    return Err(Error::protocol("SHOW_POPUP without payload"));
                }
                let payload: ShowPopupPayload = serde_json::from_str(argument)?;
                if !payload.geometry.is_valid() {
                    return Err(Error::protocol("SHOW_POPUP with invalid geometry"));
                }
                Ok(Self::ShowPopup(payload))
            }
            OutboundTag::HidePopup => {
                if !argument.is_empty() {
                    return Err(Error::protocol("HIDE_POPUP takes no argument"));
                }
                Ok(Self::HidePopup)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
