//! Wire envelope and outbound message types.
//!
//! Every frame exchanged with the server is one JSON text message.

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, from_value, to_string, to_value};

use crate::error::Result;

// ============================================================================
// Envelope
// ============================================================================

/// A message on the wire.
///
/// # Format
///
/// ```json
/// {
///   "kind": "kpi-update",
///   "payload": { ... },
///   "timestamp": 1760000000000
/// }
/// ```
///
/// Inbound frames may use `type` instead of `kind`, and may omit `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind, used for kind-specific event fan-out.
    #[serde(alias = "type")]
    pub kind: String,

    /// Optional message body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Milliseconds since the Unix epoch at hand-off time.
    #[serde(default)]
    pub timestamp: u64,
}

impl Envelope {
    /// Creates an envelope stamped with the current time.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: now_millis(),
        }
    }

    /// Parses an envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the frame is not a
    /// JSON object with a `kind` (or `type`) string.
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(from_str(text)?)
    }

    /// Serializes the envelope into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(to_string(self)?)
    }

    /// Deserializes the payload into `T`.
    ///
    /// Returns `Ok(None)` when the envelope carries no payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload does not
    /// match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.payload {
            Some(value) => Ok(Some(from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// OutboundMessage
// ============================================================================

/// A message submitted by the caller, before it is stamped for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Message kind.
    pub kind: String,
    /// Optional message body.
    pub payload: Option<Value>,
}

impl OutboundMessage {
    /// Creates a message without payload.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    /// Sets the payload.
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Creates a message with a serialized payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `payload` cannot be
    /// represented as JSON.
    pub fn json<T: Serialize + ?Sized>(kind: impl Into<String>, payload: &T) -> Result<Self> {
        Ok(Self {
            kind: kind.into(),
            payload: Some(to_value(payload)?),
        })
    }

    /// Stamps the message for the wire.
    #[inline]
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope::new(self.kind.clone(), self.payload.clone())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Current wall-clock time in milliseconds since the Unix epoch.
#[inline]
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
