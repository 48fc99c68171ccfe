//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Scope |
//! |------|-------|
//! | [`TabId`] | Host tab, non-zero |
//! | [`Generation`] | Session revision within one tab |
//! | [`FieldId`] | Input element inside one sandboxed document |
//! | [`FormId`] | Form element inside one sandboxed document |
//! | [`CredentialId`] | Stored credential, opaque |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// TabId
// ============================================================================

/// Identifier of a host tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(NonZeroU32);

impl TabId {
    /// Creates a tab ID, returning `None` for zero.
    #[inline]
    #[must_use]
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Monotonic session revision of one tab.
///
/// Bumped on every navigation. Asynchronous work captures the generation it
/// was started under and is discarded if the tab has moved on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation of a freshly attached tab.
    #[inline]
    #[must_use]
    pub const fn initial() -> Self {
        Self(0)
    }

    /// Returns the following generation.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FieldId / FormId
// ============================================================================

/// Reference to an input element inside a sandboxed document.
///
/// Never crosses the trust boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u32);

impl FieldId {
    /// Creates a field ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field-{}", self.0)
    }
}

/// Reference to a form element inside a sandboxed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(u32);

impl FormId {
    /// Creates a form ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

// ============================================================================
// CredentialId
// ============================================================================

/// Opaque identifier assigned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
    /// Wraps a store-supplied identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random UUID v4 identifier.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_rejects_zero() {
        assert!(TabId::new(0).is_none());
        assert_eq!(TabId::new(3).map(|t| t.as_u32()), Some(3));
    }

    #[test]
    fn test_generation_is_monotonic() {
        let g = Generation::initial();
        assert!(g.next() > g);
        assert_eq!(g.next().next().as_u64(), 2);
    }

    #[test]
    fn test_credential_id_generate_is_unique() {
        assert_ne!(CredentialId::generate(), CredentialId::generate());
    }

    #[test]
    fn test_credential_id_serializes_transparently() {
        let id = CredentialId::new("cred-1");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"cred-1\"");
    }
}
