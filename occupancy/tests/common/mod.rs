//! Shared setup for engine integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use bedspace_occupancy::{
    Actor, Bed, BookingRequest, Location, Money, NewProperty, OccupancyEngine, OccupancyEnvironment, Property,
    RecordingNotifier, Room, RoomLayout, RoomSpec, TenantProfile,
};
use bedspace_testing::ManualClock;
use bedspace_testing::epoch;
use std::sync::Arc;

/// Engine plus the doubles behind it.
pub struct Harness {
    pub engine: OccupancyEngine,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: ManualClock,
    pub owner: Actor,
    pub admin: Actor,
}

pub fn environment(notifier: Arc<RecordingNotifier>, clock: ManualClock) -> OccupancyEnvironment {
    OccupancyEnvironment::new(Arc::new(clock), notifier)
}

pub fn harness() -> Harness {
    harness_with(RecordingNotifier::new())
}

pub fn harness_with(notifier: RecordingNotifier) -> Harness {
    let notifier = Arc::new(notifier);
    let clock = ManualClock::new(epoch());
    Harness {
        engine: OccupancyEngine::new(environment(Arc::clone(&notifier), clock.clone())),
        notifier,
        clock,
        owner: Actor::owner("owner@casaazul.ph"),
        admin: Actor::admin("admin@bedspace.local"),
    }
}

pub fn new_property(title: &str) -> NewProperty {
    NewProperty {
        title: title.to_string(),
        location: Location {
            address: "14 Hibbard Ave".to_string(),
            city: "Dumaguete".to_string(),
            coordinates: None,
        },
        price: Money::from_pesos(3500),
        ..NewProperty::default()
    }
}

pub fn room_spec(room_number: u32, max_beds: u32, layout: RoomLayout) -> RoomSpec {
    RoomSpec {
        room_number,
        name: String::new(),
        max_beds,
        price_per_bed: Money::from_pesos(2000),
        layout,
        images: Vec::new(),
    }
}

pub fn tenant(name: &str, email: &str) -> TenantProfile {
    TenantProfile {
        full_name: name.to_string(),
        email: email.to_string(),
        address: "Purok 3".to_string(),
        barangay: "Daro".to_string(),
        municipality: "Dumaguete City".to_string(),
        gender: "female".to_string(),
        age: 20,
        citizenship: "Filipino".to_string(),
        occupation: "Student".to_string(),
    }
}

pub fn booking_request(property: &Property, room: &Room, bed: &Bed, name: &str, email: &str) -> BookingRequest {
    BookingRequest {
        property_id: property.id,
        room_id: room.id,
        bed_id: bed.id,
        tenant: tenant(name, email),
        amount: bed.price,
        message: None,
    }
}

impl Harness {
    /// Registers and verifies a property owned by `self.owner`.
    pub async fn verified_property(&self, title: &str) -> Property {
        let property = self
            .engine
            .register_property(self.owner.clone(), new_property(title))
            .await
            .unwrap();
        self.engine
            .verify_property(self.admin.clone(), property.id)
            .await
            .unwrap()
    }

    /// Creates a room in `property`.
    pub async fn room(&self, property: &Property, room_number: u32, beds: u32, layout: RoomLayout) -> (Room, Vec<Bed>) {
        self.engine
            .create_room(self.owner.clone(), property.id, room_spec(room_number, beds, layout))
            .await
            .unwrap()
    }
}
