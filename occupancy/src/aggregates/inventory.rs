//! Inventory: rooms, beds and maintenance toggles.
//!
//! A double-deck room of N frames is created as 2N beds in a single event.
//! Frame `i` holds the lower bed `2i - 1` and the upper bed `2i`, and each
//! bunk records its sibling in `pair`.

use super::{commit, owned_property, reject};
use crate::environment::OccupancyEnvironment;
use crate::error::{OccupancyError, Result};
use crate::events::OccupancyEvent;
use crate::state::OccupancyState;
use crate::types::{
    Actor, Bed, BedId, BedStatus, BedType, PropertyId, Room, RoomId, RoomLayout, RoomSpec, RoomStatus,
};
use bedspace_core::effect::Effect;
use bedspace_core::reducer::Reducer;
use bedspace_core::{SmallVec, smallvec};
use serde::{Deserialize, Serialize};

/// Upper bound on beds in one room, counting both bunks of a double-deck frame.
pub const MAX_BEDS_PER_ROOM: u32 = 64;

/// Commands for rooms and beds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum InventoryAction {
    /// The owner adds a room and its beds
    CreateRoom {
        /// Property owner
        actor: Actor,
        /// Property
        property_id: PropertyId,
        /// Id to assign
        room_id: RoomId,
        /// Room shape
        spec: RoomSpec,
    },

    /// The owner takes a free bed in or out of service
    SetBedMaintenance {
        /// Property owner
        actor: Actor,
        /// Bed
        bed_id: BedId,
        /// Enter maintenance when true
        on: bool,
    },

    /// The owner closes or reopens a room
    SetRoomMaintenance {
        /// Property owner
        actor: Actor,
        /// Room
        room_id: RoomId,
        /// Enter maintenance when true
        on: bool,
    },
}

/// Reducer for rooms and beds
#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryReducer;

impl InventoryReducer {
    /// Creates a new `InventoryReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates `CreateRoom` and returns the number of beds to create
    fn validate_create_room(
        state: &OccupancyState,
        actor: &Actor,
        property_id: &PropertyId,
        spec: &RoomSpec,
    ) -> Result<u32> {
        owned_property(state, actor, property_id, "add rooms to this property")?;

        if spec.max_beds == 0 {
            return Err(OccupancyError::validation("max_beds", "must be at least 1"));
        }
        if spec.price_per_bed.is_zero() {
            return Err(OccupancyError::validation("price_per_bed", "must be greater than zero"));
        }
        if state
            .rooms_in_property(property_id)
            .iter()
            .any(|room| room.room_number == spec.room_number)
        {
            return Err(OccupancyError::validation(
                "room_number",
                format!("room {} already exists in this property", spec.room_number),
            ));
        }

        let beds = match spec.layout {
            RoomLayout::Single => Some(spec.max_beds),
            RoomLayout::DoubleDeck => spec.max_beds.checked_mul(2),
        };
        match beds {
            Some(beds) if beds <= MAX_BEDS_PER_ROOM => Ok(beds),
            _ => Err(OccupancyError::validation(
                "max_beds",
                format!("a room holds at most {MAX_BEDS_PER_ROOM} beds"),
            )),
        }
    }

    /// Builds the bed rows of a new room
    fn build_beds(room: &Room, frames: u32) -> Vec<Bed> {
        let bed = |bed_number, bed_type| Bed {
            id: BedId::new(),
            room_id: room.id,
            property_id: room.property_id,
            bed_number,
            bed_type,
            pair: None,
            status: BedStatus::Available,
            price: room.price_per_bed,
            held_by: None,
            occupied_by: None,
        };

        match room.layout {
            RoomLayout::Single => (1..=frames).map(|n| bed(n, BedType::Single)).collect(),
            RoomLayout::DoubleDeck => (1..=frames)
                .flat_map(|frame| {
                    let mut lower = bed(2 * frame - 1, BedType::DoubleDeckLower);
                    let mut upper = bed(2 * frame, BedType::DoubleDeckUpper);
                    lower.pair = Some(upper.id);
                    upper.pair = Some(lower.id);
                    [lower, upper]
                })
                .collect(),
        }
    }

    /// Validates `SetBedMaintenance`; `Ok(false)` means nothing would change
    fn validate_bed_maintenance(state: &OccupancyState, actor: &Actor, bed_id: &BedId, on: bool) -> Result<bool> {
        let bed = state.bed(bed_id)?;
        owned_property(state, actor, &bed.property_id, "change bed maintenance")?;

        if on == (bed.status == BedStatus::Maintenance) {
            return Ok(false);
        }
        if on && (bed.held_by.is_some() || bed.occupied_by.is_some() || bed.status == BedStatus::Occupied) {
            return Err(OccupancyError::BedUnavailable(*bed_id));
        }
        Ok(true)
    }

    /// Validates `SetRoomMaintenance`; `Ok(false)` means nothing would change
    fn validate_room_maintenance(state: &OccupancyState, actor: &Actor, room_id: &RoomId, on: bool) -> Result<bool> {
        let room = state.room(room_id)?;
        owned_property(state, actor, &room.property_id, "change room maintenance")?;
        Ok(on != (room.status == RoomStatus::Maintenance))
    }
}

impl Reducer for InventoryReducer {
    type State = OccupancyState;
    type Action = InventoryAction;
    type Environment = OccupancyEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            InventoryAction::CreateRoom {
                actor,
                property_id,
                room_id,
                spec,
            } => {
                let bed_count = match Self::validate_create_room(state, &actor, &property_id, &spec) {
                    Ok(count) => count,
                    Err(error) => return reject(state, error),
                };

                let name = if spec.name.trim().is_empty() {
                    format!("Room {}", spec.room_number)
                } else {
                    spec.name.trim().to_string()
                };
                let room = Room {
                    id: room_id,
                    property_id,
                    room_number: spec.room_number,
                    name,
                    max_beds: bed_count,
                    price_per_bed: spec.price_per_bed,
                    status: RoomStatus::Available,
                    current_occupancy: 0,
                    layout: spec.layout,
                    images: spec.images,
                };
                let beds = Self::build_beds(&room, spec.max_beds);

                tracing::debug!(%room_id, beds = beds.len(), "Room created");
                let event = OccupancyEvent::RoomCreated { room, beds };
                smallvec![commit(state, &event, Some(&actor))]
            },

            InventoryAction::SetBedMaintenance { actor, bed_id, on } => {
                match Self::validate_bed_maintenance(state, &actor, &bed_id, on) {
                    Ok(true) => {},
                    Ok(false) => return smallvec![],
                    Err(error) => return reject(state, error),
                }

                let event = OccupancyEvent::BedMaintenanceSet { bed_id, on };
                smallvec![commit(state, &event, Some(&actor))]
            },

            InventoryAction::SetRoomMaintenance { actor, room_id, on } => {
                match Self::validate_room_maintenance(state, &actor, &room_id, on) {
                    Ok(true) => {},
                    Ok(false) => return smallvec![],
                    Err(error) => return reject(state, error),
                }

                let event = OccupancyEvent::RoomMaintenanceSet { room_id, on };
                smallvec![commit(state, &event, Some(&actor))]
            },
        }
    }
}
