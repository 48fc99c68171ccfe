//! Coalescing re-scan trigger.
//!
//! Independent of what reports the change (observer callback, timer,
//! polling): callers ask for a re-scan and get told whether to run now,
//! later, or not at all because one is already scheduled.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// Trigger
// ============================================================================

/// What the caller should do with a re-scan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Run the re-scan now.
    Now,
    /// Schedule one re-scan after the delay, then call
    /// [`RescanThrottle::fire`].
    After(Duration),
    /// A re-scan is already scheduled; drop this request.
    Coalesced,
}

// ============================================================================
// RescanThrottle
// ============================================================================

/// At most one re-scan per window, with a single in-flight guard.
#[derive(Debug, Clone)]
pub struct RescanThrottle {
    window: Duration,
    last_run: Option<Instant>,
    pending: bool,
}

impl RescanThrottle {
    /// Creates a throttle with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_run: None,
            pending: false,
        }
    }

    /// Registers a change at `now`.
    pub fn request(&mut self, now: Instant) -> Trigger {
        if self.pending {
            return Trigger::Coalesced;
        }

        match self.last_run {
            Some(last) if now.duration_since(last) < self.window => {
                self.pending = true;
                Trigger::After(self.window - now.duration_since(last))
            }
            _ => {
                self.last_run = Some(now);
                Trigger::Now
            }
        }
    }

    /// Records that the scheduled re-scan ran at `now`.
    pub fn fire(&mut self, now: Instant) {
        self.pending = false;
        self.last_run = Some(now);
    }

    /// Records an unthrottled scan (initial readiness) at `now`.
    pub fn mark_run(&mut self, now: Instant) {
        self.last_run = Some(now);
    }

    /// Returns `true` while a deferred re-scan is scheduled.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

// ============================================================================
// Tests
// ============================================================================
