//! The occupancy engine: reducers, state, journal and notifications wired
//! behind one async API.
//!
//! # Concurrency
//!
//! - Every write runs its reducer while holding the state write lock, so the
//!   availability check and the state change of a booking request are one
//!   atomic unit. Concurrent requests for the same bed serialize; exactly
//!   one wins.
//! - Reads take the shared lock and never observe a half-applied command.
//! - Journal entries are queued under the write lock, so the journal order
//!   matches the order in which transitions were applied.
//! - Notifications are spawned and never delay the caller. [`settle`]
//!   waits for them (and for queued journal writes) in tests and on shutdown.
//!
//! [`settle`]: OccupancyEngine::settle

use crate::aggregates::{
    BookingAction, BookingReducer, InventoryAction, InventoryReducer, PropertyAction, PropertyReducer,
    ReviewAction, ReviewReducer,
};
use crate::environment::OccupancyEnvironment;
use crate::error::{OccupancyError, Result};
use crate::events::OccupancyEvent;
use crate::ledger::OccupancyLedger;
use crate::metrics::{BEDS_FREED, BOOKING_REQUESTS, DECISIONS, JOURNAL_FAILURES, REVIEWS};
use crate::ranking;
use crate::state::OccupancyState;
use crate::types::{
    Actor, Bed, BedId, BedListing, Booking, BookingId, BookingRequest, Decision, ListingUpdate, NewProperty,
    Property, PropertyId, PropertyStatus, Review, ReviewId, Room, RoomId, RoomSpec, RoomStatus,
};
use bedspace_core::SmallVec;
use bedspace_core::effect::Effect;
use bedspace_core::event::SerializedEvent;
use bedspace_core::event_log::EventLog;
use bedspace_core::reducer::Reducer;
use bedspace_core::stream::StreamId;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, mpsc, watch};

/// Counts in-flight background work and wakes waiters when it drains.
#[derive(Debug)]
struct EffectTracker {
    pending: AtomicUsize,
    idle: watch::Sender<()>,
}

impl EffectTracker {
    fn new() -> Self {
        let (idle, _) = watch::channel(());
        Self {
            pending: AtomicUsize::new(0),
            idle,
        }
    }

    /// Registers one unit of work; it completes when the guard drops.
    fn start(self: &Arc<Self>) -> TrackerGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        TrackerGuard(Arc::clone(self))
    }

    async fn wait(&self) {
        let mut idle = self.idle.subscribe();
        while self.pending.load(Ordering::SeqCst) > 0 {
            if idle.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Marks tracked work complete on drop, including when it panics.
struct TrackerGuard(Arc<EffectTracker>);

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.send_replace(());
        }
    }
}

/// A batch of journal entries produced by one command.
struct JournalBatch {
    events: Vec<SerializedEvent>,
    _guard: TrackerGuard,
}

/// Async facade over the occupancy reducers.
///
/// Cheap to clone; clones share state, journal and notification tracking.
#[derive(Clone)]
pub struct OccupancyEngine {
    state: Arc<RwLock<OccupancyState>>,
    env: OccupancyEnvironment,
    journal: Option<mpsc::UnboundedSender<JournalBatch>>,
    tracker: Arc<EffectTracker>,
}

impl std::fmt::Debug for OccupancyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OccupancyEngine")
            .field("env", &self.env)
            .field("journaled", &self.journal.is_some())
            .field("pending_effects", &self.tracker.pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl OccupancyEngine {
    /// Creates an engine with empty state and no journal.
    #[must_use]
    pub fn new(env: OccupancyEnvironment) -> Self {
        Self::build(OccupancyState::new(), env, None)
    }

    /// Creates an engine with empty state that appends every committed event
    /// to `stream` in `log`.
    ///
    /// Must be called inside a Tokio runtime: the journal writer is a spawned
    /// task.
    #[must_use]
    pub fn with_journal(env: OccupancyEnvironment, log: Arc<dyn EventLog>, stream: StreamId) -> Self {
        Self::build(OccupancyState::new(), env, Some((log, stream)))
    }

    /// Rebuilds state by replaying `stream` from `log`, then keeps appending
    /// to it.
    ///
    /// # Errors
    ///
    /// `Journal` if the stream cannot be loaded or an entry cannot be decoded.
    #[tracing::instrument(skip(env, log, stream), fields(stream = %stream))]
    pub async fn restore(env: OccupancyEnvironment, log: Arc<dyn EventLog>, stream: StreamId) -> Result<Self> {
        let entries = log
            .load(stream.clone())
            .await
            .map_err(|error| OccupancyError::Journal(error.to_string()))?;

        let mut state = OccupancyState::new();
        for entry in &entries {
            let event = OccupancyEvent::from_serialized(entry)
                .map_err(|error| OccupancyError::Journal(format!("{}: {error}", entry.event_type)))?;
            state.apply(&event);
        }

        tracing::info!(events = entries.len(), properties = state.properties.len(), "State restored from journal");
        Ok(Self::build(state, env, Some((log, stream))))
    }

    fn build(state: OccupancyState, env: OccupancyEnvironment, journal: Option<(Arc<dyn EventLog>, StreamId)>) -> Self {
        let journal = journal.map(|(log, stream)| {
            let (tx, mut rx) = mpsc::unbounded_channel::<JournalBatch>();
            tokio::spawn(async move {
                while let Some(batch) = rx.recv().await {
                    let count = batch.events.len();
                    if let Err(error) = log.append(stream.clone(), batch.events).await {
                        tracing::warn!(%stream, count, %error, "Journal append failed");
                        metrics::counter!(JOURNAL_FAILURES).increment(1);
                    }
                }
                tracing::debug!(%stream, "Journal writer stopped");
            });
            tx
        });

        Self {
            state: Arc::new(RwLock::new(state)),
            env,
            journal,
            tracker: Arc::new(EffectTracker::new()),
        }
    }

    /// Waits until every spawned notification has finished and every queued
    /// journal batch has been written.
    pub async fn settle(&self) {
        self.tracker.wait().await;
    }

    /// Runs `action` through `reducer` under the write lock. On success,
    /// `read` extracts the caller's result and the effects are dispatched
    /// before the lock is released.
    async fn dispatch<R, T, F>(&self, reducer: R, action: R::Action, read: F) -> Result<T>
    where
        R: Reducer<State = OccupancyState, Environment = OccupancyEnvironment> + Send,
        R::Action: Send,
        F: FnOnce(&OccupancyState) -> Result<T> + Send,
    {
        let mut state = self.state.write().await;
        let effects = reducer.reduce(&mut state, action, &self.env);
        if let Some(error) = state.last_error.take() {
            return Err(error);
        }
        let result = read(&state);
        self.execute(effects);
        drop(state);
        result
    }

    fn execute(&self, effects: SmallVec<[Effect; 4]>) {
        let mut appended = Vec::new();
        for effect in effects {
            self.execute_one(effect, &mut appended);
        }

        if appended.is_empty() {
            return;
        }
        let Some(journal) = &self.journal else {
            return;
        };
        let batch = JournalBatch {
            events: appended,
            _guard: self.tracker.start(),
        };
        if journal.send(batch).is_err() {
            tracing::warn!("Journal writer is gone; events not persisted");
            metrics::counter!(JOURNAL_FAILURES).increment(1);
        }
    }

    fn execute_one(&self, effect: Effect, appended: &mut Vec<SerializedEvent>) {
        match effect {
            Effect::None => {},
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                for effect in effects {
                    self.execute_one(effect, appended);
                }
            },
            Effect::Append(event) => appended.push(event),
            Effect::Future(future) => {
                let guard = self.tracker.start();
                tokio::spawn(async move {
                    future.await;
                    drop(guard);
                });
            },
        }
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Lists a new property owned by `actor`. It starts pending and
    /// unverified.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless `actor` has the owner role
    /// - `Validation` for a blank title or a zero price
    #[tracing::instrument(skip(self, actor, details), fields(actor = %actor.user_id))]
    pub async fn register_property(&self, actor: Actor, details: NewProperty) -> Result<Property> {
        let property_id = PropertyId::new();
        self.dispatch(
            PropertyReducer::new(),
            PropertyAction::Register {
                property_id,
                actor,
                details,
            },
            move |state| state.property(&property_id).cloned(),
        )
        .await
    }

    /// Marks a property verified, opening it for bookings.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless `actor` is an admin
    /// - `NotFound` for an unknown property
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn verify_property(&self, actor: Actor, property_id: PropertyId) -> Result<Property> {
        self.dispatch(
            PropertyReducer::new(),
            PropertyAction::Verify { actor, property_id },
            move |state| state.property(&property_id).cloned(),
        )
        .await
    }

    /// Edits a listing.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless `actor` owns the property
    /// - `Validation` for a zero price, or for listing an unverified
    ///   property as available
    #[tracing::instrument(skip(self, actor, update), fields(actor = %actor.user_id))]
    pub async fn update_listing(&self, actor: Actor, property_id: PropertyId, update: ListingUpdate) -> Result<Property> {
        self.dispatch(
            PropertyReducer::new(),
            PropertyAction::UpdateListing {
                actor,
                property_id,
                update,
            },
            move |state| state.property(&property_id).cloned(),
        )
        .await
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    /// Adds a room and all its beds to a property in one step.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless `actor` owns the property
    /// - `Validation` for zero capacity, a zero price or a duplicate room
    ///   number
    #[tracing::instrument(skip(self, actor, spec), fields(actor = %actor.user_id, room_number = spec.room_number))]
    pub async fn create_room(&self, actor: Actor, property_id: PropertyId, spec: RoomSpec) -> Result<(Room, Vec<Bed>)> {
        let room_id = RoomId::new();
        self.dispatch(
            InventoryReducer::new(),
            InventoryAction::CreateRoom {
                actor,
                property_id,
                room_id,
                spec,
            },
            move |state| {
                let room = state.room(&room_id)?.clone();
                let beds = state.beds_in_room(&room_id).into_iter().cloned().collect();
                Ok((room, beds))
            },
        )
        .await
    }

    /// Takes a free bed out of service, or returns it.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless `actor` owns the property
    /// - `BedUnavailable` when the bed is held or occupied
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn set_bed_maintenance(&self, actor: Actor, bed_id: BedId, on: bool) -> Result<Bed> {
        self.dispatch(
            InventoryReducer::new(),
            InventoryAction::SetBedMaintenance { actor, bed_id, on },
            move |state| state.bed(&bed_id).cloned(),
        )
        .await
    }

    /// Closes or reopens a room.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `actor` owns the property.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn set_room_maintenance(&self, actor: Actor, room_id: RoomId, on: bool) -> Result<Room> {
        self.dispatch(
            InventoryReducer::new(),
            InventoryAction::SetRoomMaintenance { actor, room_id, on },
            move |state| state.room(&room_id).cloned(),
        )
        .await
    }

    /// Rooms of a property that are not in maintenance, by room number.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown property.
    pub async fn list_available_rooms(&self, property_id: PropertyId) -> Result<Vec<Room>> {
        let state = self.state.read().await;
        state.property(&property_id)?;
        Ok(state
            .rooms_in_property(&property_id)
            .into_iter()
            .filter(|room| room.status != RoomStatus::Maintenance)
            .cloned()
            .collect())
    }

    /// Beds of a room with their bookability, by bed number.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown room.
    pub async fn list_beds_for_room(&self, room_id: RoomId) -> Result<Vec<BedListing>> {
        let state = self.state.read().await;
        OccupancyLedger::new(&state).bed_listings(&room_id)
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    /// Places a pending booking that holds the requested bed.
    ///
    /// # Errors
    ///
    /// - `PropertyNotVerified` for an unverified property
    /// - `Validation` naming the first missing tenant field
    /// - `BedUnavailable` when the bed is held, occupied or closed
    /// - `NotFound` for unknown ids
    #[tracing::instrument(skip(self, actor, request), fields(actor = %actor.user_id, bed_id = %request.bed_id))]
    pub async fn create_booking_request(&self, actor: Actor, request: BookingRequest) -> Result<Booking> {
        let booking_id = BookingId::new();
        let result = self
            .dispatch(
                BookingReducer::new(),
                BookingAction::Request {
                    booking_id,
                    actor,
                    request,
                },
                move |state| state.booking(&booking_id).cloned(),
            )
            .await;

        let outcome = result.as_ref().map_or_else(OccupancyError::kind, |_| "created");
        metrics::counter!(BOOKING_REQUESTS, "outcome" => outcome).increment(1);
        result
    }

    /// Approves or rejects a pending booking.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless the booking is pending
    /// - `Unauthorized` unless `actor` owns the property
    /// - `BedUnavailable` when approving onto an occupied bed
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn decide(&self, actor: Actor, booking_id: BookingId, decision: Decision) -> Result<Booking> {
        let result = self
            .dispatch(
                BookingReducer::new(),
                BookingAction::Decide {
                    actor,
                    booking_id,
                    decision,
                },
                move |state| state.booking(&booking_id).cloned(),
            )
            .await;

        let outcome = match (&result, decision) {
            (Ok(_), Decision::Approve) => "approved",
            (Ok(_), Decision::Reject) => "rejected",
            (Err(error), _) => error.kind(),
        };
        metrics::counter!(DECISIONS, "outcome" => outcome).increment(1);
        result
    }

    /// Marks a bed available again. The booking that occupied it stays
    /// approved. Freeing a free bed changes nothing.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `actor` owns the property.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn free_bed(&self, actor: Actor, bed_id: BedId) -> Result<Bed> {
        let bed = self
            .dispatch(
                BookingReducer::new(),
                BookingAction::FreeBed { actor, bed_id },
                move |state| state.bed(&bed_id).cloned(),
            )
            .await?;
        metrics::counter!(BEDS_FREED).increment(1);
        Ok(bed)
    }

    /// Bookings at a property, oldest first.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown property.
    pub async fn bookings_for_property(&self, property_id: PropertyId) -> Result<Vec<Booking>> {
        let state = self.state.read().await;
        state.property(&property_id)?;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.property_id == property_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(bookings)
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// Whether `email` holds an approved booking at the property.
    pub async fn can_review(&self, property_id: PropertyId, email: &str) -> bool {
        let state = self.state.read().await;
        crate::aggregates::review::qualifying_booking(&state, &property_id, email, self.env.clock.now()).is_some()
    }

    /// Adds a verified review and refolds the property rating.
    ///
    /// # Errors
    ///
    /// - `ReviewNotAllowed` without an approved booking for the email
    /// - `Validation` for a rating outside 1 to 5
    #[tracing::instrument(skip(self, text))]
    pub async fn submit_review(&self, property_id: PropertyId, email: &str, rating: u8, text: &str) -> Result<Review> {
        let review_id = ReviewId::new();
        let result = self
            .dispatch(
                ReviewReducer::new(),
                ReviewAction::Submit {
                    review_id,
                    property_id,
                    email: email.to_string(),
                    rating,
                    text: text.to_string(),
                },
                move |state| state.review(&review_id).cloned(),
            )
            .await;

        let outcome = result.as_ref().map_or_else(OccupancyError::kind, |_| "accepted");
        metrics::counter!(REVIEWS, "outcome" => outcome).increment(1);
        result
    }

    /// Refolds a property's rating and review count from its reviews.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown property.
    pub async fn recompute_aggregate(&self, property_id: PropertyId) -> Result<Property> {
        self.dispatch(
            ReviewReducer::new(),
            ReviewAction::RecomputeRating { property_id },
            move |state| state.property(&property_id).cloned(),
        )
        .await
    }

    /// Reviews of a property, newest first.
    pub async fn reviews_for(&self, property_id: PropertyId) -> Vec<Review> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        reviews
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Verified, available properties in ranking order.
    pub async fn ranked_listings(&self) -> Vec<Property> {
        let state = self.state.read().await;
        let listed = state
            .properties
            .values()
            .filter(|p| p.verified && p.status == PropertyStatus::Available)
            .cloned()
            .collect();
        ranking::rank(listed)
    }

    /// Looks up a property.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn property(&self, property_id: PropertyId) -> Result<Property> {
        self.state.read().await.property(&property_id).cloned()
    }

    /// Looks up a room.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn room(&self, room_id: RoomId) -> Result<Room> {
        self.state.read().await.room(&room_id).cloned()
    }

    /// Looks up a bed.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn bed(&self, bed_id: BedId) -> Result<Bed> {
        self.state.read().await.bed(&bed_id).cloned()
    }

    /// Looks up a booking.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.state.read().await.booking(&booking_id).cloned()
    }

    /// Whether an approved booking occupies the bed.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown bed.
    pub async fn is_bed_occupied(&self, bed_id: BedId) -> Result<bool> {
        let state = self.state.read().await;
        OccupancyLedger::new(&state).is_occupied(&bed_id)
    }

    /// Whether a booking request for the bed would currently be accepted.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown bed.
    pub async fn is_bed_bookable(&self, bed_id: BedId) -> Result<bool> {
        let state = self.state.read().await;
        OccupancyLedger::new(&state).is_bookable(&bed_id)
    }

    /// Number of occupied beds in a room.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown room.
    pub async fn occupied_beds_in_room(&self, room_id: RoomId) -> Result<u32> {
        let state = self.state.read().await;
        OccupancyLedger::new(&state).occupied_in_room(&room_id)
    }

    /// Structural problems in the current state; empty when consistent.
    pub async fn violations(&self) -> Vec<String> {
        let state = self.state.read().await;
        OccupancyLedger::new(&state).violations()
    }

    /// A copy of the whole state.
    pub async fn snapshot(&self) -> OccupancyState {
        self.state.read().await.clone()
    }
}
