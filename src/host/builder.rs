//! Builder for [`HostCoordinator`].
//!
//! # Example
//!
//! ```ignore
//! let coordinator = HostCoordinator::builder()
//!     .store(Arc::new(MemoryStore::new()))
//!     .renderer(Arc::new(RecordingRenderer::new()))
//!     .window_size(Size::new(1280.0, 800.0))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::options::AutofillOptions;
use crate::popup::PopupRenderer;
use crate::protocol::Size;

use super::coordinator::HostCoordinator;
use super::store::CredentialStore;

// ============================================================================
// Constants
// ============================================================================

/// Window size assumed until the embedder reports one.
pub const DEFAULT_WINDOW_SIZE: Size = Size::new(1280.0, 800.0);

// ============================================================================
// CoordinatorBuilder
// ============================================================================

/// Builder for configuring a [`HostCoordinator`].
///
/// Use [`HostCoordinator::builder()`] to create one.
#[derive(Default, Clone)]
pub struct CoordinatorBuilder {
    store: Option<Arc<dyn CredentialStore>>,
    renderer: Option<Arc<dyn PopupRenderer>>,
    options: AutofillOptions,
    window: Option<Size>,
}

impl fmt::Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorBuilder")
            .field("store", &self.store.is_some())
            .field("renderer", &self.renderer.is_some())
            .field("options", &self.options)
            .field("window", &self.window)
            .finish()
    }
}

impl CoordinatorBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the credential store.
    #[inline]
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the popup renderer.
    #[inline]
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn PopupRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: AutofillOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the initial host window size.
    #[inline]
    #[must_use]
    pub fn window_size(mut self, window: Size) -> Self {
        self.window = Some(window);
        self
    }

    /// Builds the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the store or renderer is missing, the
    /// window size is not finite and positive, or the options are invalid.
    pub fn build(self) -> Result<HostCoordinator> {
        let store = self.store.ok_or_else(|| {
            Error::config("Credential store is required. Use .store() to set it.")
        })?;
        let renderer = self.renderer.ok_or_else(|| {
            Error::config("Popup renderer is required. Use .renderer() to set it.")
        })?;

        let window = self.window.unwrap_or(DEFAULT_WINDOW_SIZE);
        if !(window.width.is_finite() && window.height.is_finite())
            || window.width <= 0.0
            || window.height <= 0.0
        {
            return Err(Error::config(format!(
                "Window size must be positive, got {}x{}",
                window.width, window.height
            )));
        }

        self.options.validate()?;

        Ok(HostCoordinator::new(store, renderer, self.options, window))
    }
}

// ============================================================================
// Tests
// ============================================================================
