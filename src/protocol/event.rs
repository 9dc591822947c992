//! Client event types.
//!
//! Events are what subscribers receive from a [`SocketClient`](crate::SocketClient).
//! Every event is addressed by an [`EventName`].
//!
//! # Event Names
//!
//! | Name | Fired when |
//! |------|------------|
//! | `connect` | transport opened |
//! | `disconnect` | transport closed or caller disconnected |
//! | `message` | any well-formed inbound envelope |
//! | `error` | construction failure, transport error, malformed frame |
//! | `pong` | inbound envelope of kind `pong` |
//! | anything else | inbound envelope of that kind |

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Value, from_value};

use crate::error::Result;

use super::Envelope;

// ============================================================================
// EventName
// ============================================================================

/// Key under which handlers are registered.
///
/// Reserved names map to their own variant; any other name addresses the
/// kind-specific fan-out of inbound messages.
///
/// ```
/// use resilient_socket::EventName;
///
/// assert_eq!(EventName::from("connect"), EventName::Connect);
/// assert_eq!(EventName::from("kpi-update"), EventName::Kind("kpi-update".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Transport opened.
    Connect,
    /// Transport closed.
    Disconnect,
    /// Any inbound envelope.
    Message,
    /// Connection-wide failure.
    Error,
    /// Inbound `pong`.
    Pong,
    /// Inbound envelope of a specific kind.
    Kind(String),
}

impl EventName {
    /// Returns the name for the kind-specific event of an inbound envelope.
    #[inline]
    #[must_use]
    pub fn for_kind(kind: &str) -> Self {
        if kind == "pong" {
            Self::Pong
        } else {
            Self::Kind(kind.to_string())
        }
    }

    /// Returns the string form of the name.
    #[must_use]
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Self::Connect => Cow::Borrowed("connect"),
            Self::Disconnect => Cow::Borrowed("disconnect"),
            Self::Message => Cow::Borrowed("message"),
            Self::Error => Cow::Borrowed("error"),
            Self::Pong => Cow::Borrowed("pong"),
            Self::Kind(kind) => Cow::Borrowed(kind.as_str()),
        }
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        match name {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "message" => Self::Message,
            "error" => Self::Error,
            "pong" => Self::Pong,
            other => Self::Kind(other.to_string()),
        }
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<&EventName> for EventName {
    fn from(name: &EventName) -> Self {
        name.clone()
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

// ============================================================================
// DisconnectInfo
// ============================================================================

/// Close code and reason of a disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectInfo {
    /// WebSocket close code (1000 = normal, 1006 = abnormal).
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl DisconnectInfo {
    /// Creates disconnect info.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DisconnectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "{} (code {})", self.reason, self.code)
        }
    }
}

// ============================================================================
// ErrorEvent
// ============================================================================

/// Category of a connection-wide failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport could not be created.
    Construction,
    /// Transport reported a low-level error.
    Transport,
    /// Inbound frame was not a valid envelope.
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction => f.write_str("construction"),
            Self::Transport => f.write_str("transport"),
            Self::Parse => f.write_str("parse"),
        }
    }
}

/// Payload of [`ClientEvent::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable cause.
    pub message: String,
    /// Raw inbound frame, for parse failures.
    pub raw: Option<String>,
}

impl ErrorEvent {
    /// Creates a construction failure.
    #[inline]
    #[must_use]
    pub fn construction(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Construction,
            message: message.into(),
            raw: None,
        }
    }

    /// Creates a transport failure.
    #[inline]
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
            raw: None,
        }
    }

    /// Creates a parse failure carrying the offending frame.
    #[inline]
    #[must_use]
    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            message: message.into(),
            raw: Some(raw.into()),
        }
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

// ============================================================================
// ClientEvent
// ============================================================================

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Transport opened.
    Connect,
    /// Transport closed.
    Disconnect(DisconnectInfo),
    /// Full inbound envelope.
    Message(Envelope),
    /// Connection-wide failure.
    Error(ErrorEvent),
    /// Inbound `pong` with its payload.
    Pong(Option<Value>),
    /// Payload of an inbound envelope, delivered under its kind.
    Kind {
        /// Message kind.
        kind: String,
        /// Message payload.
        payload: Option<Value>,
    },
}

impl ClientEvent {
    /// Returns the name this event is dispatched under.
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            Self::Connect => EventName::Connect,
            Self::Disconnect(_) => EventName::Disconnect,
            Self::Message(_) => EventName::Message,
            Self::Error(_) => EventName::Error,
            Self::Pong(_) => EventName::Pong,
            Self::Kind { kind, .. } => EventName::Kind(kind.clone()),
        }
    }

    /// Builds the kind-specific event for an inbound envelope.
    #[must_use]
    pub(crate) fn for_envelope(envelope: Envelope) -> Self {
        if envelope.kind == "pong" {
            Self::Pong(envelope.payload)
        } else {
            Self::Kind {
                kind: envelope.kind,
                payload: envelope.payload,
            }
        }
    }

    /// Returns the message payload carried by this event, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Message(envelope) => envelope.payload.as_ref(),
            Self::Pong(payload) | Self::Kind { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// Deserializes the carried payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload does not
    /// match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.payload() {
            Some(value) => Ok(Some(from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
