//! Business metrics for the occupancy engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `bedspace_booking_requests_total{outcome}` - Booking requests by outcome
//!   (`created` or an error kind)
//! - `bedspace_decisions_total{outcome}` - Owner decisions (`approved`,
//!   `rejected` or an error kind)
//! - `bedspace_beds_freed_total` - Beds released by owners
//! - `bedspace_reviews_total{outcome}` - Review submissions by outcome
//! - `bedspace_notification_failures_total{kind}` - Notifications that could
//!   not be delivered
//! - `bedspace_journal_failures_total` - Journal appends that failed
//!
//! No exporter is installed here; the embedding application chooses one.

use metrics::describe_counter;

/// Booking requests by outcome.
pub const BOOKING_REQUESTS: &str = "bedspace_booking_requests_total";
/// Owner decisions by outcome.
pub const DECISIONS: &str = "bedspace_decisions_total";
/// Beds freed.
pub const BEDS_FREED: &str = "bedspace_beds_freed_total";
/// Review submissions by outcome.
pub const REVIEWS: &str = "bedspace_reviews_total";
/// Undelivered notifications.
pub const NOTIFICATION_FAILURES: &str = "bedspace_notification_failures_total";
/// Failed journal appends.
pub const JOURNAL_FAILURES: &str = "bedspace_journal_failures_total";

/// Initialize and register all metric descriptions.
///
/// Call once at startup, before any metrics are recorded.
pub fn register_metrics() {
    describe_counter!(
        BOOKING_REQUESTS,
        "Total booking requests by outcome (created, bed_unavailable, validation, ...)"
    );
    describe_counter!(
        DECISIONS,
        "Total owner decisions by outcome (approved, rejected, invalid_transition, ...)"
    );
    describe_counter!(BEDS_FREED, "Total accepted free-bed commands, including beds that were already free");
    describe_counter!(REVIEWS, "Total review submissions by outcome");
    describe_counter!(
        NOTIFICATION_FAILURES,
        "Notifications that could not be delivered, by kind"
    );
    describe_counter!(JOURNAL_FAILURES, "Journal appends that failed");

    tracing::info!("Occupancy metrics registered");
}
