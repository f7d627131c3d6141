//! Journal event trait and its serialized wire form.
//!
//! Events are facts the engine has already committed to its state. They are
//! encoded as JSON so the journal stays readable from `psql` and survives
//! additive schema changes (new optional fields deserialize with defaults).
//!
//! # Example
//!
//! ```
//! use bedspace_core::event::{Event, SerializedEvent};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
//! enum BedEvent {
//!     BedFreed { bed: String },
//! }
//!
//! impl Event for BedEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             BedEvent::BedFreed { .. } => "BedFreed.v1",
//!         }
//!     }
//! }
//!
//! let event = BedEvent::BedFreed { bed: "b-1".into() };
//! let serialized = SerializedEvent::from_event(&event, None).unwrap();
//! assert_eq!(serialized.event_type, "BedFreed.v1");
//! assert_eq!(BedEvent::from_bytes(&serialized.data).unwrap(), event);
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Encoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The event could not be encoded
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// The body is not valid JSON for the event type
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be journaled and replayed to reconstruct state.
///
/// `event_type()` returns a stable identifier with a version suffix
/// (`"BookingApproved.v1"`) so readers can route and evolve schemas.
pub trait Event: Send + Sync + 'static {
    /// Versioned type name stored alongside the body.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        serde_json::to_vec(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// describe a different event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        serde_json::from_slice(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// An event as stored in the journal: type name, JSON body, metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "`BookingApproved.v1`").
    pub event_type: String,

    /// The JSON-encoded event body.
    pub data: Vec<u8>,

    /// Optional metadata (actor id, correlation id, ...).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Builds an entry from already-encoded parts.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Create a serialized event from an `Event`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bytes)",
            self.event_type,
            self.data.len()
        )
    }
}
