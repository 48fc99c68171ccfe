//! Inbound half of the bridge for real webviews: script re-execution.
//!
//! A webview host can only reach into a page by executing script there.
//! [`ScriptSurface`] turns any [`ScriptExecutor`] into a
//! [`SandboxedSurface`] by rendering inbound messages as `postMessage`
//! fragments and wrapping the embedder's scanner bundle in the per-context
//! injection marker.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Geometry, InboundMessage};

use super::surface::SandboxedSurface;

// ============================================================================
// Constants
// ============================================================================

/// Global marker set inside the page once a scanner instance is running.
pub const INJECTION_MARKER: &str = "__tabshell_autofill_active__";

// ============================================================================
// ScriptExecutor
// ============================================================================

/// Executes script inside one sandboxed page (webview binding).
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Runs `script` in the page's main world.
    async fn execute_script(&self, script: &str) -> Result<()>;
}

// ============================================================================
// ScriptSurface
// ============================================================================

/// A [`SandboxedSurface`] backed by script execution.
pub struct ScriptSurface<E> {
    executor: E,
    bootstrap: String,
    bounds: Mutex<Geometry>,
}

impl<E: ScriptExecutor> ScriptSurface<E> {
    /// Creates a surface.
    ///
    /// `scanner_bundle` is the page-side scanner script; it is wrapped with
    /// [`guarded_bootstrap`] once, here.
    #[must_use]
    pub fn new(executor: E, scanner_bundle: &str, bounds: Geometry) -> Self {
        Self {
            executor,
            bootstrap: guarded_bootstrap(scanner_bundle),
            bounds: Mutex::new(bounds),
        }
    }

    /// Updates the surface rectangle after a host layout change.
    pub fn set_bounds(&self, bounds: Geometry) {
        *self.bounds.lock() = bounds;
    }

    /// Returns the wrapped executor.
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }
}

#[async_trait]
impl<E: ScriptExecutor> SandboxedSurface for ScriptSurface<E> {
    async fn inject_scanner(&self) -> Result<()> {
        debug!(script_len = self.bootstrap.len(), "Injecting scanner bootstrap");
        self.executor.execute_script(&self.bootstrap).await
    }

    async fn post_message(&self, message: &InboundMessage) -> Result<()> {
        let script = post_message_script(message)?;
        debug!(tag = message.tag(), "Posting inbound message");
        self.executor.execute_script(&script).await
    }

    fn bounding_rect(&self) -> Geometry {
        *self.bounds.lock()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Renders the fragment that posts `message` onto the page's own window.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
pub fn post_message_script(message: &InboundMessage) -> Result<String> {
    let json = js_literal(&serde_json::to_string(&message.to_value()?)?);
    Ok(format!("window.postMessage({json}, \"*\");"))
}

/// Wraps a scanner bundle so that only the first execution per page
/// context runs it.
#[must_use]
pub fn guarded_bootstrap(scanner_bundle: &str) -> String {
    format!(
        r#"(function() {{
    if (window["{marker}"]) {{ return; }}
    Object.defineProperty(window, "{marker}", {{ value: true, configurable: false }});
{scanner_bundle}
}})();"#,
        marker = INJECTION_MARKER,
    )
}

/// JSON is a JavaScript literal except for the two line separators.
fn js_literal(json: &str) -> String {
    json.replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

// ============================================================================
// Tests
// ============================================================================
