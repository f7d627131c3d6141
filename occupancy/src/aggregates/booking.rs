//! Booking lifecycle.
//!
//! ```text
//! pending --approve--> approved
//! pending --reject---> rejected
//! ```
//!
//! A pending booking holds its bed, so a second request for the same bed is
//! refused with `BedUnavailable` until the owner rejects the first one.
//! Approval turns the hold into occupancy. Freeing a bed clears occupancy but
//! leaves the approved booking untouched.

use super::{commit, owned_property, reject};
use crate::environment::OccupancyEnvironment;
use crate::error::{OccupancyError, Result};
use crate::events::OccupancyEvent;
use crate::ledger::OccupancyLedger;
use crate::notify::NotificationKind;
use crate::state::OccupancyState;
use crate::types::{
    Actor, BedId, BedStatus, Booking, BookingId, BookingRequest, BookingStatus, Decision, TenantProfile,
};
use bedspace_core::effect::Effect;
use bedspace_core::reducer::Reducer;
use bedspace_core::{SmallVec, smallvec};
use serde::{Deserialize, Serialize};

/// Commands for the booking lifecycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BookingAction {
    /// A tenant asks to hold a bed
    Request {
        /// Id to assign
        booking_id: BookingId,
        /// Requesting user
        actor: Actor,
        /// Bed, tenant identity and amount
        request: BookingRequest,
    },

    /// The owner approves or rejects a pending booking
    Decide {
        /// Property owner
        actor: Actor,
        /// Booking
        booking_id: BookingId,
        /// Verdict
        decision: Decision,
    },

    /// The owner releases a bed
    FreeBed {
        /// Property owner
        actor: Actor,
        /// Bed
        bed_id: BedId,
    },
}

/// Reducer for the booking lifecycle
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks every required tenant field, naming the first missing one
    fn validate_tenant(tenant: &TenantProfile) -> Result<()> {
        let required = [
            ("full_name", &tenant.full_name),
            ("email", &tenant.email),
            ("address", &tenant.address),
            ("barangay", &tenant.barangay),
            ("municipality", &tenant.municipality),
            ("gender", &tenant.gender),
            ("citizenship", &tenant.citizenship),
            ("occupation", &tenant.occupation),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(OccupancyError::validation(field, "is required"));
        }
        if !tenant.email.contains('@') {
            return Err(OccupancyError::validation("email", "is not an email address"));
        }
        if tenant.age == 0 {
            return Err(OccupancyError::validation("age", "is required"));
        }
        Ok(())
    }

    fn validate_request(state: &OccupancyState, request: &BookingRequest) -> Result<()> {
        let property = state.property(&request.property_id)?;
        // Only verification gates bookings; an inactive listing is hidden from
        // rankings but its existing rooms still take requests.
        if !property.verified {
            return Err(OccupancyError::PropertyNotVerified(property.id));
        }

        Self::validate_tenant(&request.tenant)?;

        let room = state.room(&request.room_id)?;
        if room.property_id != request.property_id {
            return Err(OccupancyError::validation("room_id", "room does not belong to the property"));
        }
        let bed = state.bed(&request.bed_id)?;
        if bed.room_id != request.room_id {
            return Err(OccupancyError::validation("bed_id", "bed does not belong to the room"));
        }

        if !OccupancyLedger::new(state).bookable(bed) {
            return Err(OccupancyError::BedUnavailable(bed.id));
        }
        Ok(())
    }

    fn validate_decide(
        state: &OccupancyState,
        actor: &Actor,
        booking_id: &BookingId,
        decision: Decision,
    ) -> Result<()> {
        let booking = state.booking(booking_id)?;
        if booking.status != BookingStatus::Pending {
            return Err(OccupancyError::InvalidTransition {
                booking_id: *booking_id,
                from: booking.status,
                to: decision.target_status(),
            });
        }

        owned_property(state, actor, &booking.property_id, "decide on this booking")?;

        if decision == Decision::Approve {
            let bed = state.bed(&booking.bed_id)?;
            if bed.occupied_by.is_some() || bed.status == BedStatus::Occupied {
                return Err(OccupancyError::BedUnavailable(bed.id));
            }
        }
        Ok(())
    }

    /// Validates `FreeBed`; `Ok(false)` means the bed is already free
    fn validate_free_bed(state: &OccupancyState, actor: &Actor, bed_id: &BedId) -> Result<bool> {
        let bed = state.bed(bed_id)?;
        owned_property(state, actor, &bed.property_id, "free this bed")?;
        Ok(bed.status != BedStatus::Available || bed.occupied_by.is_some())
    }

    fn notification_payload(state: &OccupancyState, booking: &Booking) -> serde_json::Value {
        let title = state.properties.get(&booking.property_id).map(|p| p.title.as_str());
        let room_number = state.rooms.get(&booking.room_id).map(|r| r.room_number);
        let bed_number = state.beds.get(&booking.bed_id).map(|b| b.bed_number);

        serde_json::json!({
            "booking_id": booking.id,
            "property_id": booking.property_id,
            "property_title": title,
            "room_number": room_number,
            "bed_number": bed_number,
            "tenant_name": booking.tenant.full_name,
            "tenant_email": booking.tenant.email,
            "status": booking.status,
            "total_amount_cents": booking.total_amount.cents(),
        })
    }
}

impl Reducer for BookingReducer {
    type State = OccupancyState;
    type Action = BookingAction;
    type Environment = OccupancyEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            BookingAction::Request {
                booking_id,
                actor,
                request,
            } => {
                if let Err(error) = Self::validate_request(state, &request) {
                    return reject(state, error);
                }

                let booking = Booking {
                    id: booking_id,
                    property_id: request.property_id,
                    room_id: request.room_id,
                    bed_id: request.bed_id,
                    tenant_id: actor.user_id,
                    tenant: request.tenant,
                    message: request.message.filter(|m| !m.trim().is_empty()),
                    status: BookingStatus::Pending,
                    total_amount: request.amount,
                    created_at: env.clock.now(),
                    decided_at: None,
                };
                let payload = Self::notification_payload(state, &booking);
                let owner_email = state
                    .properties
                    .get(&booking.property_id)
                    .map(|p| p.owner_email.clone())
                    .unwrap_or_default();

                let event = OccupancyEvent::BookingRequested { booking };
                smallvec![
                    commit(state, &event, Some(&actor)),
                    env.notify(&owner_email, NotificationKind::BookingRequested, payload),
                ]
            },

            BookingAction::Decide {
                actor,
                booking_id,
                decision,
            } => {
                if let Err(error) = Self::validate_decide(state, &actor, &booking_id, decision) {
                    return reject(state, error);
                }

                let decided_at = env.clock.now();
                let (event, kind) = match decision {
                    Decision::Approve => (
                        OccupancyEvent::BookingApproved {
                            booking_id,
                            decided_at,
                        },
                        NotificationKind::BookingApproved,
                    ),
                    Decision::Reject => (
                        OccupancyEvent::BookingRejected {
                            booking_id,
                            decided_at,
                        },
                        NotificationKind::BookingRejected,
                    ),
                };
                let append = commit(state, &event, Some(&actor));

                let Ok(booking) = state.booking(&booking_id) else {
                    return smallvec![append];
                };
                let payload = Self::notification_payload(state, booking);
                let tenant_email = booking.tenant.email.clone();

                smallvec![append, env.notify(&tenant_email, kind, payload)]
            },

            BookingAction::FreeBed { actor, bed_id } => {
                match Self::validate_free_bed(state, &actor, &bed_id) {
                    Ok(true) => {},
                    Ok(false) => return smallvec![],
                    Err(error) => return reject(state, error),
                }

                let event = OccupancyEvent::BedFreed {
                    bed_id,
                    freed_at: env.clock.now(),
                };
                smallvec![commit(state, &event, Some(&actor))]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::aggregates::fixtures::{environment, tenant_profile, world};
    use crate::types::{Money, PropertyId, PropertyStatus, RoomStatus};
    use bedspace_testing::{ReducerTest, assertions, epoch};

    fn request(w: &crate::aggregates::fixtures::World, bed_id: BedId, email: &str) -> BookingRequest {
        BookingRequest {
            property_id: w.property_id,
            room_id: w.room_id,
            bed_id,
            tenant: tenant_profile("Ana Reyes", email),
            amount: Money::from_pesos(1500),
            message: Some("Moving in June".to_string()),
        }
    }

    #[test]
    fn request_holds_the_bed_and_notifies_owner() {
        let w = world(1);
        let bed_id = w.bed_ids[0];
        let booking_id = BookingId::new();
        let request = request(&w, bed_id, "ana@example.com");

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Request {
                booking_id,
                actor: Actor::tenant("ana@example.com"),
                request,
            })
            .then_state(move |state| {
                let booking = state.booking(&booking_id).unwrap();
                assert_eq!(booking.status, BookingStatus::Pending);
                assert_eq!(booking.total_amount, Money::from_pesos(1500));
                assert_eq!(booking.created_at, epoch());

                let bed = state.bed(&bed_id).unwrap();
                assert_eq!(bed.held_by, Some(booking_id));
                assert_eq!(bed.status, BedStatus::Available);
                assert!(!OccupancyLedger::new(state).is_bookable(&bed_id).unwrap());
            })
            .then_effects(|effects| {
                assertions::assert_appended(effects, &["BookingRequested.v1"]);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_request_for_held_bed_is_refused() {
        let mut w = world(1);
        let bed_id = w.bed_ids[0];
        let first = w.pending_booking(bed_id, "ana@example.com");
        let request = request(&w, bed_id, "carla@example.com");

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Request {
                booking_id: BookingId::new(),
                actor: Actor::tenant("carla@example.com"),
                request,
            })
            .then_state(move |state| {
                assert_eq!(state.last_error, Some(OccupancyError::BedUnavailable(bed_id)));
                assert_eq!(state.bookings.len(), 1);
                assert_eq!(state.bed(&bed_id).unwrap().held_by, Some(first));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn unverified_property_refuses_bookings() {
        let mut w = world(1);
        w.state.properties.get_mut(&w.property_id).unwrap().verified = false;
        let request = request(&w, w.bed_ids[0], "ana@example.com");
        let property_id = w.property_id;

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Request {
                booking_id: BookingId::new(),
                actor: Actor::tenant("ana@example.com"),
                request,
            })
            .then_state(move |state| {
                assert_eq!(state.last_error, Some(OccupancyError::PropertyNotVerified(property_id)));
            })
            .run();
    }

    #[test]
    fn inactive_verified_property_still_takes_requests() {
        let w = world(1);
        let mut state = w.state;
        state.properties.get_mut(&w.property_id).unwrap().status = PropertyStatus::Inactive;
        let booking_id = BookingId::new();
        let request = BookingRequest {
            property_id: w.property_id,
            room_id: w.room_id,
            bed_id: w.bed_ids[0],
            tenant: tenant_profile("Ana Reyes", "ana@example.com"),
            amount: Money::from_pesos(1500),
            message: None,
        };

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(state)
            .when_action(BookingAction::Request {
                booking_id,
                actor: Actor::tenant("ana@example.com"),
                request,
            })
            .then_state(move |state| {
                assert!(state.last_error.is_none());
                assert_eq!(state.booking(&booking_id).unwrap().status, BookingStatus::Pending);
            })
            .run();
    }

    #[test]
    fn missing_tenant_field_is_named() {
        let w = world(1);
        let mut request = request(&w, w.bed_ids[0], "ana@example.com");
        request.tenant.barangay = "  ".to_string();

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Request {
                booking_id: BookingId::new(),
                actor: Actor::tenant("ana@example.com"),
                request,
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(OccupancyError::validation("barangay", "is required"))
                );
                assert!(state.bookings.is_empty());
            })
            .run();
    }

    #[test]
    fn unknown_property_is_not_found() {
        let w = world(1);
        let mut request = request(&w, w.bed_ids[0], "ana@example.com");
        request.property_id = PropertyId::new();

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Request {
                booking_id: BookingId::new(),
                actor: Actor::tenant("ana@example.com"),
                request,
            })
            .then_state(|state| {
                assert!(matches!(
                    state.last_error,
                    Some(OccupancyError::NotFound { entity: "Property", .. })
                ));
            })
            .run();
    }

    #[test]
    fn approval_occupies_bed_and_fills_room() {
        let mut w = world(1);
        let bed_id = w.bed_ids[0];
        let room_id = w.room_id;
        let property_id = w.property_id;
        let booking_id = w.pending_booking(bed_id, "ana@example.com");

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Decide {
                actor: w.owner,
                booking_id,
                decision: Decision::Approve,
            })
            .then_state(move |state| {
                let booking = state.booking(&booking_id).unwrap();
                assert_eq!(booking.status, BookingStatus::Approved);
                assert_eq!(booking.decided_at, Some(epoch()));

                let bed = state.bed(&bed_id).unwrap();
                assert_eq!(bed.status, BedStatus::Occupied);
                assert_eq!(bed.occupied_by, Some(booking_id));
                assert_eq!(bed.held_by, None);

                let room = state.room(&room_id).unwrap();
                assert_eq!(room.current_occupancy, 1);
                assert_eq!(room.status, RoomStatus::Full);
                assert_eq!(state.property(&property_id).unwrap().booking_count, 1);
                assert!(OccupancyLedger::new(state).violations().is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_appended(effects, &["BookingApproved.v1"]);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn rejection_releases_the_hold() {
        let mut w = world(2);
        let bed_id = w.bed_ids[0];
        let room_id = w.room_id;
        let booking_id = w.pending_booking(bed_id, "ana@example.com");

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Decide {
                actor: w.owner,
                booking_id,
                decision: Decision::Reject,
            })
            .then_state(move |state| {
                assert_eq!(state.booking(&booking_id).unwrap().status, BookingStatus::Rejected);
                assert!(OccupancyLedger::new(state).is_bookable(&bed_id).unwrap());
                assert_eq!(state.room(&room_id).unwrap().current_occupancy, 0);
            })
            .then_effects(|effects| {
                assertions::assert_appended(effects, &["BookingRejected.v1"]);
            })
            .run();
    }

    #[test]
    fn decided_booking_cannot_be_decided_again() {
        let mut w = world(1);
        let booking_id = w.approved_booking(w.bed_ids[0], "ana@example.com");

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Decide {
                actor: w.owner,
                booking_id,
                decision: Decision::Reject,
            })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(OccupancyError::InvalidTransition {
                        booking_id,
                        from: BookingStatus::Approved,
                        to: BookingStatus::Rejected,
                    })
                );
                assert_eq!(state.booking(&booking_id).unwrap().status, BookingStatus::Approved);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn only_the_owner_decides() {
        let mut w = world(1);
        let booking_id = w.pending_booking(w.bed_ids[0], "ana@example.com");

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::Decide {
                actor: Actor::owner("other-owner@example.com"),
                booking_id,
                decision: Decision::Approve,
            })
            .then_state(move |state| {
                assert!(matches!(state.last_error, Some(OccupancyError::Unauthorized { .. })));
                assert_eq!(state.booking(&booking_id).unwrap().status, BookingStatus::Pending);
            })
            .run();
    }

    #[test]
    fn freeing_keeps_booking_approved() {
        let mut w = world(1);
        let bed_id = w.bed_ids[0];
        let room_id = w.room_id;
        let booking_id = w.approved_booking(bed_id, "ana@example.com");

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::FreeBed {
                actor: w.owner,
                bed_id,
            })
            .then_state(move |state| {
                let bed = state.bed(&bed_id).unwrap();
                assert_eq!(bed.status, BedStatus::Available);
                assert_eq!(bed.occupied_by, None);

                let room = state.room(&room_id).unwrap();
                assert_eq!(room.current_occupancy, 0);
                assert_eq!(room.status, RoomStatus::Available);
                assert_eq!(state.booking(&booking_id).unwrap().status, BookingStatus::Approved);
                assert!(OccupancyLedger::new(state).violations().is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_appended(effects, &["BedFreed.v1"]);
            })
            .run();
    }

    #[test]
    fn freeing_a_free_bed_is_a_no_op() {
        let w = world(1);
        let bed_id = w.bed_ids[0];

        ReducerTest::new(BookingReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(BookingAction::FreeBed {
                actor: w.owner,
                bed_id,
            })
            .then_state(|state| assert!(state.last_error.is_none()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
