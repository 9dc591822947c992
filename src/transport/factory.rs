//! The seam between the client and any text-message transport.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use url::Url;

use crate::error::Result;

use super::EventSink;

// ============================================================================
// Transport
// ============================================================================

/// An open (or opening) text-message channel.
///
/// Implementations must not call back into the client synchronously; all
/// state changes go through the [`EventSink`] handed to the factory.
pub trait Transport: Send + Sync {
    /// Hands a text frame to the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be accepted right now.
    fn send(&self, text: String) -> Result<()>;

    /// Starts closing the channel. Idempotent.
    fn close(&self);
}

// ============================================================================
// TransportFactory
// ============================================================================

/// Creates transports for a URL.
pub trait TransportFactory: Send + Sync + 'static {
    /// Constructs a transport that reports to `events`.
    ///
    /// Connection progress is reported asynchronously through `events`
    /// (`Open`, then messages, then exactly one `Close`).
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot even be constructed. The
    /// client treats this like an immediate drop.
    fn connect(&self, url: &Url, events: EventSink) -> Result<Box<dyn Transport>>;
}

impl<F: TransportFactory + ?Sized> TransportFactory for Arc<F> {
    fn connect(&self, url: &Url, events: EventSink) -> Result<Box<dyn Transport>> {
        (**self).connect(url, events)
    }
}
