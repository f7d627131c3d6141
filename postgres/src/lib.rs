//! `PostgreSQL` event journal for the Bedspace occupancy engine.
//!
//! Implements the [`EventLog`](bedspace_core::event_log::EventLog) trait from
//! `bedspace-core` on top of sqlx:
//!
//! - Append-only `occupancy_events` table keyed by `(stream_id, version)`
//! - Gapless per-stream versions under concurrent writers
//! - Connection pooling
//! - Idempotent schema setup ([`PostgresEventLog::migrate`])
//!
//! # Example
//!
//! ```ignore
//! use bedspace_postgres::PostgresEventLog;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let log = PostgresEventLog::connect("postgres://localhost/bedspace", 10).await?;
//!     log.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod event_log;

pub use event_log::PostgresEventLog;
