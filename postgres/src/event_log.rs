//! [`EventLog`] backed by a `PostgreSQL` table.

use bedspace_core::event::SerializedEvent;
use bedspace_core::event_log::{EventLog, EventLogError, EventLogFuture};
use bedspace_core::stream::{StreamId, Version};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};

const SCHEMA: &str = include_str!("../migrations/001_create_occupancy_events.sql");

fn database_error(error: sqlx::Error) -> EventLogError {
    EventLogError::DatabaseError(error.to_string())
}

/// Event journal stored in the `occupancy_events` table.
///
/// Appends to one stream are serialized with a transaction-scoped advisory
/// lock, so versions stay gapless even with several writers.
#[derive(Clone, Debug)]
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    /// Connects a new pool.
    ///
    /// # Errors
    ///
    /// `DatabaseError` if the database is unreachable.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, EventLogError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(database_error)?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the journal table and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// `DatabaseError` if the schema cannot be applied.
    pub async fn migrate(&self) -> Result<(), EventLogError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        tracing::info!("Journal schema ready");
        Ok(())
    }

    /// Current version of a stream; 0 when it has no events.
    ///
    /// # Errors
    ///
    /// `DatabaseError` on query failure.
    pub async fn stream_version(&self, stream_id: &StreamId) -> Result<Version, EventLogError> {
        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM occupancy_events WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(database_error)?;
        Ok(Version::new(u64::try_from(version).unwrap_or_default()))
    }
}

impl EventLog for PostgresEventLog {
    fn append(&self, stream_id: StreamId, events: Vec<SerializedEvent>) -> EventLogFuture<'_, Version> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(database_error)?;

            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(stream_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;

            let mut version: i64 =
                sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM occupancy_events WHERE stream_id = $1")
                    .bind(stream_id.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(database_error)?;

            for event in &events {
                version += 1;
                sqlx::query(
                    "INSERT INTO occupancy_events (stream_id, version, event_type, event_data, metadata) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(stream_id.as_str())
                .bind(version)
                .bind(&event.event_type)
                .bind(&event.data)
                .bind(&event.metadata)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
            }

            tx.commit().await.map_err(database_error)?;

            tracing::debug!(%stream_id, count = events.len(), version, "Events appended");
            metrics::counter!("bedspace_journal_events_appended_total").increment(events.len() as u64);
            Ok(Version::new(u64::try_from(version).unwrap_or_default()))
        })
    }

    fn load(&self, stream_id: StreamId) -> EventLogFuture<'_, Vec<SerializedEvent>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT event_type, event_data, metadata FROM occupancy_events \
                 WHERE stream_id = $1 ORDER BY version ASC",
            )
            .bind(stream_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

            rows.into_iter()
                .map(|row| {
                    let decode = |error: sqlx::Error| EventLogError::SerializationError(error.to_string());
                    Ok(SerializedEvent::new(
                        row.try_get("event_type").map_err(decode)?,
                        row.try_get("event_data").map_err(decode)?,
                        row.try_get("metadata").map_err(decode)?,
                    ))
                })
                .collect()
        })
    }
}
