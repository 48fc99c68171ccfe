//! Credential store seam.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::CredentialId;
use crate::protocol::Credential;
use crate::protocol::credential::hostname_of;

// ============================================================================
// CredentialStore
// ============================================================================

/// Source of saved credentials. Storage format and encryption are the
/// implementor's business.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns every credential saved for the host of `url`.
    ///
    /// Matching is exact and case-insensitive on the host; subdomains do not
    /// match their parent.
    ///
    /// # Errors
    ///
    /// Implementations report backend failures as [`Error::Store`].
    async fn get_for_url(&self, url: &Url) -> Result<Vec<Credential>>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store indexed by lowercased host.
#[derive(Debug, Default)]
pub struct MemoryStore {
    by_host: RwLock<FxHashMap<String, Vec<Credential>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] for the first credential whose URL has no
    /// host.
    pub fn with_credentials(credentials: impl IntoIterator<Item = Credential>) -> Result<Self> {
        let store = Self::new();
        for credential in credentials {
            store.insert(credential)?;
        }
        Ok(store)
    }

    /// Adds a credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the credential URL has no host.
    pub fn insert(&self, credential: Credential) -> Result<()> {
        let host = hostname_of(&credential.url).ok_or_else(|| {
            Error::store(format!("credential URL has no host: {}", credential.url))
        })?;
        debug!(%host, username = %credential.username, "Credential stored");
        self.by_host.write().entry(host).or_default().push(credential);
        Ok(())
    }

    /// Removes a credential by id. Returns `true` if it existed.
    pub fn remove(&self, id: &CredentialId) -> bool {
        let mut by_host = self.by_host.write();
        let mut removed = false;
        by_host.retain(|_, credentials| {
            let before = credentials.len();
            credentials.retain(|c| &c.id != id);
            removed |= credentials.len() != before;
            !credentials.is_empty()
        });
        removed
    }

    /// Total number of credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_host.read().values().map(Vec::len).sum()
    }

    /// Returns `true` if the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_host.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_for_url(&self, url: &Url) -> Result<Vec<Credential>> {
        let Some(host) = url.host_str() else {
            return Ok(Vec::new());
        };
        Ok(self
            .by_host
            .read()
            .get(&host.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Tests
// ============================================================================
