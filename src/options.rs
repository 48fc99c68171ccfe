//! Autofill configuration.
//!
//! Provides a type-safe interface for the timing and popup layout knobs of
//! the protocol.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tabshell_autofill::AutofillOptions;
//!
//! let options = AutofillOptions::new()
//!     .with_rescan_throttle(Duration::from_millis(250))
//!     .with_lookup_timeout(Duration::from_secs(2));
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Minimum interval between two DOM-mutation re-scans.
pub const DEFAULT_RESCAN_THROTTLE: Duration = Duration::from_millis(500);

/// Delay between a field blur and the hide request, so a pointer-down on
/// the popup can land first.
pub const DEFAULT_BLUR_GRACE: Duration = Duration::from_millis(150);

// ============================================================================
// ScannerOptions
// ============================================================================

/// Page-side timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerOptions {
    /// Re-scan throttle window.
    pub rescan_throttle: Duration,

    /// Blur grace delay.
    pub blur_grace: Duration,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            rescan_throttle: DEFAULT_RESCAN_THROTTLE,
            blur_grace: DEFAULT_BLUR_GRACE,
        }
    }
}

// ============================================================================
// PopupStyle
// ============================================================================

/// Popup layout in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupStyle {
    /// Popup is at least this wide, or as wide as the field if wider.
    pub min_width: f64,

    /// Height of one entry.
    pub row_height: f64,

    /// Entries beyond this scroll.
    pub max_rows: usize,
}

impl Default for PopupStyle {
    fn default() -> Self {
        Self {
            min_width: 220.0,
            row_height: 28.0,
            max_rows: 6,
        }
    }
}

// ============================================================================
// AutofillOptions
// ============================================================================

/// All autofill configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutofillOptions {
    /// Page-side timing.
    pub scanner: ScannerOptions,

    /// Popup layout.
    pub popup: PopupStyle,

    /// Upper bound on a credential store lookup. `None` waits forever; the
    /// UI stays responsive either way.
    pub lookup_timeout: Option<Duration>,
}

impl AutofillOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the re-scan throttle window.
    #[inline]
    #[must_use]
    pub fn with_rescan_throttle(mut self, window: Duration) -> Self {
        self.scanner.rescan_throttle = window;
        self
    }

    /// Sets the blur grace delay.
    #[inline]
    #[must_use]
    pub fn with_blur_grace(mut self, grace: Duration) -> Self {
        self.scanner.blur_grace = grace;
        self
    }

    /// Sets a lookup timeout.
    #[inline]
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    /// Sets the popup layout.
    #[inline]
    #[must_use]
    pub fn with_popup_style(mut self, style: PopupStyle) -> Self {
        self.popup = style;
        self
    }

    /// Checks the options for values the protocol cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.scanner.rescan_throttle.is_zero() {
            return Err(Error::config("rescan throttle must be non-zero"));
        }
        if self.lookup_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("lookup timeout must be non-zero"));
        }
        let style = &self.popup;
        if !(style.row_height.is_finite() && style.row_height > 0.0) {
            return Err(Error::config("popup row height must be positive"));
        }
        if !(style.min_width.is_finite() && style.min_width > 0.0) {
            return Err(Error::config("popup min width must be positive"));
        }
        if style.max_rows == 0 {
            return Err(Error::config("popup must show at least one row"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
