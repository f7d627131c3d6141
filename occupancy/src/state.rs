//! In-memory state of the occupancy engine.
//!
//! All entity mutation happens in [`OccupancyState::apply`], which is used both
//! when a command commits and when the journal is replayed. Derived fields
//! (room occupancy and status, property rating and booking count) are folds
//! over the underlying rows and are recomputed whenever an input changes.

use crate::error::{OccupancyError, Result};
use crate::events::OccupancyEvent;
use crate::types::{
    Bed, BedId, BedStatus, Booking, BookingId, BookingStatus, Property, PropertyId,
    PropertyStatus, Review, ReviewId, Room, RoomId, RoomStatus,
};
use std::collections::HashMap;

/// Properties, rooms, beds, bookings and reviews known to the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OccupancyState {
    /// Properties by id
    pub properties: HashMap<PropertyId, Property>,
    /// Rooms by id
    pub rooms: HashMap<RoomId, Room>,
    /// Beds by id
    pub beds: HashMap<BedId, Bed>,
    /// Bookings by id
    pub bookings: HashMap<BookingId, Booking>,
    /// Reviews by id
    pub reviews: HashMap<ReviewId, Review>,
    /// Rejection recorded by the last reducer call
    pub last_error: Option<OccupancyError>,
}

impl OccupancyState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a property.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn property(&self, id: &PropertyId) -> Result<&Property> {
        self.properties
            .get(id)
            .ok_or_else(|| OccupancyError::not_found("Property", id))
    }

    /// Looks up a room.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn room(&self, id: &RoomId) -> Result<&Room> {
        self.rooms
            .get(id)
            .ok_or_else(|| OccupancyError::not_found("Room", id))
    }

    /// Looks up a bed.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn bed(&self, id: &BedId) -> Result<&Bed> {
        self.beds
            .get(id)
            .ok_or_else(|| OccupancyError::not_found("Bed", id))
    }

    /// Looks up a booking.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn booking(&self, id: &BookingId) -> Result<&Booking> {
        self.bookings
            .get(id)
            .ok_or_else(|| OccupancyError::not_found("Booking", id))
    }

    /// Looks up a review.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn review(&self, id: &ReviewId) -> Result<&Review> {
        self.reviews
            .get(id)
            .ok_or_else(|| OccupancyError::not_found("Review", id))
    }

    /// Beds of a room, ordered by bed number.
    #[must_use]
    pub fn beds_in_room(&self, room_id: &RoomId) -> Vec<&Bed> {
        let mut beds: Vec<&Bed> = self
            .beds
            .values()
            .filter(|bed| bed.room_id == *room_id)
            .collect();
        beds.sort_by_key(|bed| bed.bed_number);
        beds
    }

    /// Rooms of a property, ordered by room number.
    #[must_use]
    pub fn rooms_in_property(&self, property_id: &PropertyId) -> Vec<&Room> {
        let mut rooms: Vec<&Room> = self
            .rooms
            .values()
            .filter(|room| room.property_id == *property_id)
            .collect();
        rooms.sort_by_key(|room| room.room_number);
        rooms
    }

    /// Applies a committed event.
    ///
    /// Events referencing unknown ids are ignored; reducers validate before
    /// emitting, so this only happens with a foreign journal.
    pub fn apply(&mut self, event: &OccupancyEvent) {
        match event {
            OccupancyEvent::PropertyRegistered { property } => {
                self.properties.insert(property.id, property.clone());
            },

            OccupancyEvent::PropertyVerified { property_id, .. } => {
                if let Some(property) = self.properties.get_mut(property_id) {
                    property.verified = true;
                    if property.status == PropertyStatus::Pending {
                        property.status = PropertyStatus::Available;
                    }
                }
            },

            OccupancyEvent::ListingUpdated {
                property_id,
                update,
            } => {
                if let Some(property) = self.properties.get_mut(property_id) {
                    if let Some(price) = update.price {
                        property.price = price;
                    }
                    if let Some(amenities) = &update.amenities {
                        property.amenities.clone_from(amenities);
                    }
                    if let Some(status) = update.status {
                        property.status = status;
                    }
                    if let Some(featured) = update.featured {
                        property.featured = featured;
                    }
                    if let Some(images) = &update.images {
                        property.images.clone_from(images);
                    }
                }
            },

            OccupancyEvent::RoomCreated { room, beds } => {
                self.rooms.insert(room.id, room.clone());
                for bed in beds {
                    self.beds.insert(bed.id, bed.clone());
                }
                self.recompute_room(&room.id);
            },

            OccupancyEvent::BedMaintenanceSet { bed_id, on } => {
                if let Some(bed) = self.beds.get_mut(bed_id) {
                    bed.status = if *on {
                        BedStatus::Maintenance
                    } else {
                        BedStatus::Available
                    };
                }
            },

            OccupancyEvent::RoomMaintenanceSet { room_id, on } => {
                if let Some(room) = self.rooms.get_mut(room_id) {
                    // Leaving maintenance: recompute_room derives Available/Full.
                    room.status = if *on {
                        RoomStatus::Maintenance
                    } else {
                        RoomStatus::Available
                    };
                }
                self.recompute_room(room_id);
            },

            OccupancyEvent::BookingRequested { booking } => {
                if let Some(bed) = self.beds.get_mut(&booking.bed_id) {
                    bed.held_by = Some(booking.id);
                }
                self.bookings.insert(booking.id, booking.clone());
            },

            OccupancyEvent::BookingApproved {
                booking_id,
                decided_at,
            } => {
                let Some(booking) = self.bookings.get_mut(booking_id) else {
                    return;
                };
                booking.status = BookingStatus::Approved;
                booking.decided_at = Some(*decided_at);
                let (bed_id, room_id, property_id) =
                    (booking.bed_id, booking.room_id, booking.property_id);

                if let Some(bed) = self.beds.get_mut(&bed_id) {
                    if bed.held_by == Some(*booking_id) {
                        bed.held_by = None;
                    }
                    bed.occupied_by = Some(*booking_id);
                    bed.status = BedStatus::Occupied;
                }
                self.recompute_room(&room_id);
                self.recompute_booking_count(&property_id);
            },

            OccupancyEvent::BookingRejected {
                booking_id,
                decided_at,
            } => {
                let Some(booking) = self.bookings.get_mut(booking_id) else {
                    return;
                };
                booking.status = BookingStatus::Rejected;
                booking.decided_at = Some(*decided_at);
                if let Some(bed) = self.beds.get_mut(&booking.bed_id) {
                    if bed.held_by == Some(*booking_id) {
                        bed.held_by = None;
                    }
                }
            },

            OccupancyEvent::BedFreed { bed_id, .. } => {
                let Some(bed) = self.beds.get_mut(bed_id) else {
                    return;
                };
                bed.status = BedStatus::Available;
                bed.occupied_by = None;
                let room_id = bed.room_id;
                self.recompute_room(&room_id);
            },

            OccupancyEvent::ReviewSubmitted { review } => {
                self.reviews.insert(review.id, review.clone());
                self.recompute_rating(&review.property_id);
            },
        }
    }

    /// Recomputes a room's occupancy from its beds and, unless the room is in
    /// maintenance, its status.
    pub fn recompute_room(&mut self, room_id: &RoomId) {
        let occupied = self
            .beds
            .values()
            .filter(|bed| bed.room_id == *room_id && bed.status == BedStatus::Occupied)
            .count();
        let occupied = u32::try_from(occupied).unwrap_or(u32::MAX);

        if let Some(room) = self.rooms.get_mut(room_id) {
            room.current_occupancy = occupied;
            if room.status != RoomStatus::Maintenance {
                room.status = if occupied >= room.max_beds {
                    RoomStatus::Full
                } else {
                    RoomStatus::Available
                };
            }
        }
    }

    /// Recomputes a property's booking count as the number of approved
    /// bookings against it.
    pub fn recompute_booking_count(&mut self, property_id: &PropertyId) {
        let approved = self
            .bookings
            .values()
            .filter(|b| b.property_id == *property_id && b.status == BookingStatus::Approved)
            .count();

        if let Some(property) = self.properties.get_mut(property_id) {
            property.booking_count = u32::try_from(approved).unwrap_or(u32::MAX);
        }
    }

    /// Recomputes a property's rating and review count from its verified
    /// reviews. Running it twice yields the same result.
    pub fn recompute_rating(&mut self, property_id: &PropertyId) {
        let (rating, count) = aggregate_rating(
            self.reviews
                .values()
                .filter(|r| r.property_id == *property_id && r.verified)
                .map(|r| r.rating),
        );

        if let Some(property) = self.properties.get_mut(property_id) {
            property.rating = rating;
            property.review_count = count;
        }
    }
}

/// Mean of the ratings rounded to one decimal, and their count. `0.0` when
/// there are none.
#[must_use]
pub fn aggregate_rating(ratings: impl Iterator<Item = u8>) -> (f64, u32) {
    let (sum, count) = ratings.fold((0_u64, 0_u32), |(sum, count), rating| {
        (sum + u64::from(rating), count.saturating_add(1))
    });
    if count == 0 {
        return (0.0, 0);
    }
    #[allow(clippy::cast_precision_loss)] // sums of 1..=5 stay far below 2^52
    let mean = sum as f64 / f64::from(count);
    ((mean * 10.0).round() / 10.0, count)
}
