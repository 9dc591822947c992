//! Wire protocol and client event types.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `Envelope` | both | JSON text frame `{kind, payload?, timestamp}` |
//! | `OutboundMessage` | caller → client | message before stamping |
//! | `ClientEvent` | client → subscribers | lifecycle and inbound events |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Wire envelope and outbound messages |
//! | `event` | Event names and event payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Wire envelope and outbound messages.
pub mod envelope;

/// Event names and event payloads.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{Envelope, OutboundMessage};
pub use event::{ClientEvent, DisconnectInfo, ErrorEvent, ErrorKind, EventName};
