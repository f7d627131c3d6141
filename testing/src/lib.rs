//! # Bedspace Testing
//!
//! Testing utilities for the Bedspace workspace.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Journal doubles ([`InMemoryEventLog`], [`FailingEventLog`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//!
//! ## Example
//!
//! ```ignore
//! use bedspace_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(InventoryReducer::new())
//!     .with_env(test_environment())
//!     .given_state(OccupancyState::new())
//!     .when_action(InventoryAction::CreateRoom { .. })
//!     .then_state(|state| assert_eq!(state.beds.len(), 4))
//!     .run();
//! ```

use bedspace_core::environment::Clock;
use chrono::{DateTime, Utc};


/// Mock implementations of Environment traits and the event journal.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use bedspace_core::event::SerializedEvent;
    use bedspace_core::event_log::{EventLog, EventLogError, EventLogFuture};
    use bedspace_core::stream::{StreamId, Version};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Clock frozen at one instant
    ///
    /// Timestamps never move, so reducer output is reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bedspace_testing::mocks::FixedClock;
    /// use bedspace_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Clock frozen at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test advances it.
    ///
    /// Clones share the same underlying instant.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Clock frozen at [`epoch`]
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// 2025-01-01 00:00:00 UTC, the instant every test clock starts from.
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// In-memory event journal.
    ///
    /// Clones share storage, so a test can hand one clone to the engine and
    /// inspect or replay the other.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryEventLog {
        streams: Arc<Mutex<HashMap<StreamId, Vec<SerializedEvent>>>>,
    }

    impl InMemoryEventLog {
        /// Create an empty journal.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of a stream's events.
        #[must_use]
        pub fn events(&self, stream_id: &StreamId) -> Vec<SerializedEvent> {
            self.streams
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(stream_id)
                .cloned()
                .unwrap_or_default()
        }

        /// Event type names of a stream, oldest first.
        #[must_use]
        pub fn event_types(&self, stream_id: &StreamId) -> Vec<String> {
            self.events(stream_id)
                .into_iter()
                .map(|event| event.event_type)
                .collect()
        }
    }

    impl EventLog for InMemoryEventLog {
        fn append(&self, stream_id: StreamId, events: Vec<SerializedEvent>) -> EventLogFuture<'_, Version> {
            Box::pin(async move {
                let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
                let stream = streams.entry(stream_id).or_default();
                stream.extend(events);
                Ok(Version::new(stream.len() as u64))
            })
        }

        fn load(&self, stream_id: StreamId) -> EventLogFuture<'_, Vec<SerializedEvent>> {
            Box::pin(async move { Ok(self.events(&stream_id)) })
        }
    }

    /// Journal whose writes always fail; loads return nothing.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingEventLog;

    impl EventLog for FailingEventLog {
        fn append(&self, _stream_id: StreamId, _events: Vec<SerializedEvent>) -> EventLogFuture<'_, Version> {
            Box::pin(async { Err(EventLogError::Unavailable("journal offline".to_string())) })
        }

        fn load(&self, _stream_id: StreamId) -> EventLogFuture<'_, Vec<SerializedEvent>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }
}

pub use mocks::{FailingEventLog, FixedClock, InMemoryEventLog, ManualClock, epoch, test_clock};
pub use reducer_test::{ReducerTest, assertions};
