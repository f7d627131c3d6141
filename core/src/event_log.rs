//! Append-only event journal abstraction.
//!
//! The occupancy engine keeps its authoritative state in memory and writes
//! every committed fact to an [`EventLog`] behind it. On restart the log is
//! replayed to rebuild the same state.
//!
//! # Implementations
//!
//! - `PostgresEventLog` in `bedspace-postgres` (production)
//! - `InMemoryEventLog` in `bedspace-testing` (tests, demo)
//!
//! # Dyn Compatibility
//!
//! The trait returns `Pin<Box<dyn Future>>` instead of using `async fn` so it
//! can be held as `Arc<dyn EventLog>` by the engine's journal writer task.

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during journal operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Stored payload could not be decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The log refused the write (test doubles, read-only replicas).
    #[error("Journal unavailable: {0}")]
    Unavailable(String),
}

/// Boxed future returned by [`EventLog`] methods.
pub type EventLogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EventLogError>> + Send + 'a>>;

/// Append-only store of serialized events grouped by stream.
pub trait EventLog: Send + Sync {
    /// Append events to the end of a stream.
    ///
    /// Returns the stream version after the append. Appending to an unknown
    /// stream creates it.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: storage failure
    /// - `Unavailable`: the log does not accept writes
    fn append(&self, stream_id: StreamId, events: Vec<SerializedEvent>) -> EventLogFuture<'_, Version>;

    /// Load every event of a stream, oldest first.
    ///
    /// An unknown stream yields an empty vector.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: storage failure
    /// - `SerializationError`: a stored row could not be decoded
    fn load(&self, stream_id: StreamId) -> EventLogFuture<'_, Vec<SerializedEvent>>;
}
