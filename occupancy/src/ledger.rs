//! Read view over bed occupancy.
//!
//! The ledger never writes. It answers occupancy questions strictly from bed
//! state, and can audit the state against the structural rules that every
//! committed transition must preserve.

use crate::error::Result;
use crate::state::OccupancyState;
use crate::types::{Bed, BedId, BedListing, BedStatus, BedType, BookingStatus, RoomId, RoomStatus};
use std::collections::HashMap;

/// Borrowed occupancy view of an [`OccupancyState`].
#[derive(Clone, Copy, Debug)]
pub struct OccupancyLedger<'a> {
    state: &'a OccupancyState,
}

impl<'a> OccupancyLedger<'a> {
    /// Creates a view over `state`
    #[must_use]
    pub const fn new(state: &'a OccupancyState) -> Self {
        Self { state }
    }

    /// Whether an approved booking occupies the bed.
    ///
    /// # Errors
    ///
    /// `NotFound` if the bed is unknown.
    pub fn is_occupied(&self, bed_id: &BedId) -> Result<bool> {
        Ok(self.state.bed(bed_id)?.status == BedStatus::Occupied)
    }

    /// Whether a booking request for the bed would be accepted.
    ///
    /// # Errors
    ///
    /// `NotFound` if the bed is unknown.
    pub fn is_bookable(&self, bed_id: &BedId) -> Result<bool> {
        Ok(self.bookable(self.state.bed(bed_id)?))
    }

    /// Bookability of a bed already in hand: available, neither held nor
    /// occupied, and its room is not in maintenance.
    #[must_use]
    pub fn bookable(&self, bed: &Bed) -> bool {
        let room_open = self
            .state
            .rooms
            .get(&bed.room_id)
            .is_some_and(|room| room.status != RoomStatus::Maintenance);

        bed.status == BedStatus::Available
            && bed.held_by.is_none()
            && bed.occupied_by.is_none()
            && room_open
    }

    /// Number of occupied beds in a room.
    ///
    /// # Errors
    ///
    /// `NotFound` if the room is unknown.
    pub fn occupied_in_room(&self, room_id: &RoomId) -> Result<u32> {
        self.state.room(room_id)?;
        let occupied = self
            .state
            .beds_in_room(room_id)
            .into_iter()
            .filter(|bed| bed.status == BedStatus::Occupied)
            .count();
        Ok(u32::try_from(occupied).unwrap_or(u32::MAX))
    }

    /// Beds of a room with their bookability, ordered by bed number.
    ///
    /// # Errors
    ///
    /// `NotFound` if the room is unknown.
    pub fn bed_listings(&self, room_id: &RoomId) -> Result<Vec<BedListing>> {
        self.state.room(room_id)?;
        Ok(self
            .state
            .beds_in_room(room_id)
            .into_iter()
            .map(|bed| BedListing {
                bed: bed.clone(),
                bookable: self.bookable(bed),
            })
            .collect())
    }

    /// Audits the state and returns one message per broken rule.
    ///
    /// An empty result means: every occupied bed is backed by exactly one
    /// approved booking, no booking occupies two beds, room occupancy matches
    /// its beds and stays within capacity, holds point at pending bookings, and
    /// bunk pairs are mutual.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut occupants: HashMap<_, BedId> = HashMap::new();

        for bed in self.state.beds.values() {
            match (bed.status, bed.occupied_by) {
                (BedStatus::Occupied, Some(booking_id)) => {
                    let approved = self
                        .state
                        .bookings
                        .get(&booking_id)
                        .is_some_and(|b| b.status == BookingStatus::Approved && b.bed_id == bed.id);
                    if !approved {
                        violations.push(format!(
                            "bed {} occupied by {booking_id} which is not an approved booking for it",
                            bed.id
                        ));
                    }
                    if let Some(other) = occupants.insert(booking_id, bed.id) {
                        violations.push(format!("booking {booking_id} occupies beds {other} and {}", bed.id));
                    }
                },
                (BedStatus::Occupied, None) => {
                    violations.push(format!("bed {} is occupied without an occupant", bed.id));
                },
                (_, Some(booking_id)) => {
                    violations.push(format!(
                        "bed {} references occupant {booking_id} but is not occupied",
                        bed.id
                    ));
                },
                (_, None) => {},
            }

            if let Some(booking_id) = bed.held_by {
                let pending = self
                    .state
                    .bookings
                    .get(&booking_id)
                    .is_some_and(|b| b.status == BookingStatus::Pending);
                if !pending {
                    violations.push(format!("bed {} held by non-pending booking {booking_id}", bed.id));
                }
            }

            if let Some(pair) = bed.pair {
                let mutual = self.state.beds.get(&pair).is_some_and(|sibling| {
                    sibling.pair == Some(bed.id)
                        && sibling.room_id == bed.room_id
                        && matches!(
                            (bed.bed_type, sibling.bed_type),
                            (BedType::DoubleDeckLower, BedType::DoubleDeckUpper)
                                | (BedType::DoubleDeckUpper, BedType::DoubleDeckLower)
                        )
                });
                if !mutual {
                    violations.push(format!("bed {} has a one-sided bunk pair {pair}", bed.id));
                }
            }
        }

        for room in self.state.rooms.values() {
            let occupied = self
                .state
                .beds
                .values()
                .filter(|bed| bed.room_id == room.id && bed.status == BedStatus::Occupied)
                .count();
            if usize::try_from(room.current_occupancy).ok() != Some(occupied) {
                violations.push(format!(
                    "room {} reports occupancy {} but has {occupied} occupied beds",
                    room.id, room.current_occupancy
                ));
            }
            if room.current_occupancy > room.max_beds {
                violations.push(format!(
                    "room {} occupancy {} exceeds capacity {}",
                    room.id, room.current_occupancy, room.max_beds
                ));
            }
        }

        violations
    }
}
