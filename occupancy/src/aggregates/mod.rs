//! Reducers of the occupancy engine.
//!
//! Every reducer works on the shared [`OccupancyState`]. A command is first
//! validated; on failure the error is stored in `state.last_error` and no
//! effects are returned. On success the reducer builds one
//! [`OccupancyEvent`], applies it, and returns an [`Effect::Append`] for the
//! journal followed by any notification effects.

pub mod booking;
pub mod inventory;
pub mod property;
pub mod review;

pub use booking::{BookingAction, BookingReducer};
pub use inventory::{InventoryAction, InventoryReducer};
pub use property::{PropertyAction, PropertyReducer};
pub use review::{ReviewAction, ReviewReducer};

use crate::error::{OccupancyError, Result};
use crate::events::OccupancyEvent;
use crate::metrics::JOURNAL_FAILURES;
use crate::state::OccupancyState;
use crate::types::{Actor, Property, PropertyId};
use bedspace_core::effect::Effect;
use bedspace_core::event::Event;
use bedspace_core::{SmallVec, smallvec};

/// Applies `event` and describes its journal entry.
///
/// The transition stands even if the event cannot be encoded; the failure is
/// logged and counted like any other journal failure.
pub(crate) fn commit(state: &mut OccupancyState, event: &OccupancyEvent, actor: Option<&Actor>) -> Effect {
    let metadata = actor.map(|actor| {
        serde_json::json!({
            "actor_id": actor.user_id,
            "role": actor.role,
        })
    });
    let serialized = event.to_serialized(metadata);
    state.apply(event);

    match serialized {
        Ok(serialized) => Effect::Append(serialized),
        Err(error) => {
            tracing::warn!(event_type = event.event_type(), %error, "Event could not be journaled");
            metrics::counter!(JOURNAL_FAILURES).increment(1);
            Effect::None
        },
    }
}

/// Records a rejected command.
pub(crate) fn reject(state: &mut OccupancyState, error: OccupancyError) -> SmallVec<[Effect; 4]> {
    tracing::debug!(kind = error.kind(), %error, "Command rejected");
    state.last_error = Some(error);
    smallvec![]
}

/// Returns the property if `actor` owns it.
pub(crate) fn owned_property<'a>(
    state: &'a OccupancyState,
    actor: &Actor,
    property_id: &PropertyId,
    action: &'static str,
) -> Result<&'a Property> {
    let property = state.property(property_id)?;
    if property.owner_id != actor.user_id {
        return Err(OccupancyError::Unauthorized {
            actor: actor.user_id,
            action,
        });
    }
    Ok(property)
}

/// Shared fixtures for reducer unit tests.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use crate::environment::OccupancyEnvironment;
    use crate::events::OccupancyEvent;
    use crate::notify::RecordingNotifier;
    use crate::state::OccupancyState;
    use crate::types::{
        Actor, Bed, BedId, BedStatus, BedType, Booking, BookingId, BookingStatus, Location, Money,
        Property, PropertyId, PropertyStatus, Room, RoomId, RoomLayout, RoomStatus, TenantProfile,
    };
    use bedspace_testing::{epoch, test_clock};
    use std::sync::Arc;

    pub fn environment() -> OccupancyEnvironment {
        OccupancyEnvironment::new(Arc::new(test_clock()), Arc::new(RecordingNotifier::new()))
    }

    pub fn tenant_profile(name: &str, email: &str) -> TenantProfile {
        TenantProfile {
            full_name: name.to_string(),
            email: email.to_string(),
            address: "12 Rizal St".to_string(),
            barangay: "Poblacion".to_string(),
            municipality: "Dumaguete".to_string(),
            gender: "female".to_string(),
            age: 21,
            citizenship: "Filipino".to_string(),
            occupation: "Student".to_string(),
        }
    }

    /// A verified property owned by `owner` with one single room holding
    /// `beds` beds.
    pub struct World {
        pub state: OccupancyState,
        pub owner: Actor,
        pub property_id: PropertyId,
        pub room_id: RoomId,
        pub bed_ids: Vec<BedId>,
    }

    pub fn world(beds: u32) -> World {
        let owner = Actor::owner("owner@example.com");
        let property_id = PropertyId::new();
        let room_id = RoomId::new();
        let mut state = OccupancyState::new();

        state.apply(&OccupancyEvent::PropertyRegistered {
            property: Property {
                id: property_id,
                owner_id: owner.user_id,
                owner_email: owner.email.clone(),
                title: "Casa Azul".to_string(),
                location: Location {
                    address: "Silliman Ave".to_string(),
                    city: "Dumaguete".to_string(),
                    coordinates: None,
                },
                price: Money::from_pesos(3000),
                amenities: std::collections::BTreeSet::new(),
                images: Vec::new(),
                verified: true,
                status: PropertyStatus::Available,
                featured: false,
                created_at: epoch(),
                rating: 0.0,
                review_count: 0,
                booking_count: 0,
            },
        });

        let room = Room {
            id: room_id,
            property_id,
            room_number: 1,
            name: "Room 1".to_string(),
            max_beds: beds,
            price_per_bed: Money::from_pesos(1500),
            status: RoomStatus::Available,
            current_occupancy: 0,
            layout: RoomLayout::Single,
            images: Vec::new(),
        };
        let bed_rows: Vec<Bed> = (1..=beds)
            .map(|bed_number| Bed {
                id: BedId::new(),
                room_id,
                property_id,
                bed_number,
                bed_type: BedType::Single,
                pair: None,
                status: BedStatus::Available,
                price: Money::from_pesos(1500),
                held_by: None,
                occupied_by: None,
            })
            .collect();
        let bed_ids = bed_rows.iter().map(|bed| bed.id).collect();
        state.apply(&OccupancyEvent::RoomCreated { room, beds: bed_rows });

        World {
            state,
            owner,
            property_id,
            room_id,
            bed_ids,
        }
    }

    impl World {
        /// Inserts a pending booking holding `bed_id`.
        pub fn pending_booking(&mut self, bed_id: BedId, email: &str) -> BookingId {
            let booking = Booking {
                id: BookingId::new(),
                property_id: self.property_id,
                room_id: self.room_id,
                bed_id,
                tenant_id: Actor::tenant(email).user_id,
                tenant: tenant_profile("Ana Reyes", email),
                message: None,
                status: BookingStatus::Pending,
                total_amount: Money::from_pesos(1500),
                created_at: epoch(),
                decided_at: None,
            };
            let id = booking.id;
            self.state.apply(&OccupancyEvent::BookingRequested { booking });
            id
        }

        /// Inserts an approved booking occupying `bed_id`.
        pub fn approved_booking(&mut self, bed_id: BedId, email: &str) -> BookingId {
            let id = self.pending_booking(bed_id, email);
            self.state.apply(&OccupancyEvent::BookingApproved {
                booking_id: id,
                decided_at: epoch(),
            });
            id
        }
    }
}
