//! Outbound half of the bridge: the page's text side channel.
//!
//! In a real webview this is the console; here it is an unbounded tokio
//! channel of lines. Order is preserved within the channel.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::protocol::OutboundMessage;

// ============================================================================
// Constructor
// ============================================================================

/// Creates a connected sender/receiver pair for one sandboxed context.
#[must_use]
pub fn outbound_channel() -> (OutboundChannel, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutboundChannel { tx }, OutboundReceiver { rx })
}

// ============================================================================
// OutboundChannel
// ============================================================================

/// Page-side writer. Cloning yields another writer to the same line stream.
#[derive(Debug, Clone)]
pub struct OutboundChannel {
    tx: mpsc::UnboundedSender<String>,
}

impl OutboundChannel {
    /// Encodes and writes a protocol message.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if encoding fails
    /// - [`Error::ChannelClosed`] if the host side is gone
    pub fn emit(&self, message: &OutboundMessage) -> Result<()> {
        let line = message.to_line()?;
        trace!(tag = message.tag().as_str(), "Outbound line");
        self.write_line(line)
    }

    /// Writes an arbitrary line, as page scripts do with their own logging.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the host side is gone.
    pub fn write_line(&self, line: impl Into<String>) -> Result<()> {
        self.tx.send(line.into()).map_err(|_| Error::ChannelClosed)
    }
}

// ============================================================================
// OutboundReceiver
// ============================================================================

/// Host-side reader.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl OutboundReceiver {
    /// Receives the next raw line, or `None` once every writer is dropped.
    pub async fn recv_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Takes every message already queued without waiting, skipping
    /// anything [`decode_line`] drops.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            if let Some(message) = decode_line(&line) {
                messages.push(message);
            }
        }
        messages
    }

    /// Receives the next well-formed protocol message, skipping anything
    /// [`decode_line`] drops.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        loop {
            let line = self.rx.recv().await?;
            if let Some(message) = decode_line(&line) {
                return Some(message);
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Decodes one observed line; never panics.
///
/// Foreign lines are ignored quietly. Marked lines that fail to parse are
/// logged and dropped.
#[must_use]
pub fn decode_line(line: &str) -> Option<OutboundMessage> {
    match OutboundMessage::from_console_line(line) {
        None => {
            trace!(len = line.len(), "Ignoring foreign console line");
            None
        }
        Some(Ok(message)) => Some(message),
        Some(Err(e)) => {
            warn!(error = %e, "Dropping malformed outbound line");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
