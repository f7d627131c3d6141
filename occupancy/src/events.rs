//! Journal events.
//!
//! Each successful command produces exactly one [`OccupancyEvent`]. The event
//! is applied to the in-memory state and appended to the journal; replaying
//! the journal through [`OccupancyState::apply`](crate::state::OccupancyState::apply)
//! rebuilds the same state.

use crate::types::{
    Bed, BedId, Booking, BookingId, ListingUpdate, Property, PropertyId, Review, Room, RoomId,
};
use bedspace_core::event::{Event, EventError, SerializedEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Facts committed by the occupancy engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OccupancyEvent {
    /// An owner listed a property
    PropertyRegistered {
        /// The new property
        property: Property,
    },

    /// An admin verified a property
    PropertyVerified {
        /// Property
        property_id: PropertyId,
        /// When verified
        verified_at: DateTime<Utc>,
    },

    /// An owner edited a listing
    ListingUpdated {
        /// Property
        property_id: PropertyId,
        /// Applied edit
        update: ListingUpdate,
    },

    /// A room and all its beds were created
    RoomCreated {
        /// The new room
        room: Room,
        /// Its beds, ordered by bed number
        beds: Vec<Bed>,
    },

    /// A bed entered or left maintenance
    BedMaintenanceSet {
        /// Bed
        bed_id: BedId,
        /// In maintenance after the change
        on: bool,
    },

    /// A room entered or left maintenance
    RoomMaintenanceSet {
        /// Room
        room_id: RoomId,
        /// In maintenance after the change
        on: bool,
    },

    /// A tenant placed a pending booking holding a bed
    BookingRequested {
        /// The new booking
        booking: Booking,
    },

    /// The owner approved a booking; its bed is now occupied
    BookingApproved {
        /// Booking
        booking_id: BookingId,
        /// When approved
        decided_at: DateTime<Utc>,
    },

    /// The owner rejected a booking; its hold is released
    BookingRejected {
        /// Booking
        booking_id: BookingId,
        /// When rejected
        decided_at: DateTime<Utc>,
    },

    /// The owner freed an occupied bed
    BedFreed {
        /// Bed
        bed_id: BedId,
        /// When freed
        freed_at: DateTime<Utc>,
    },

    /// A tenant reviewed a property
    ReviewSubmitted {
        /// The new review
        review: Review,
    },
}

impl Event for OccupancyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::PropertyRegistered { .. } => "PropertyRegistered.v1",
            Self::PropertyVerified { .. } => "PropertyVerified.v1",
            Self::ListingUpdated { .. } => "ListingUpdated.v1",
            Self::RoomCreated { .. } => "RoomCreated.v1",
            Self::BedMaintenanceSet { .. } => "BedMaintenanceSet.v1",
            Self::RoomMaintenanceSet { .. } => "RoomMaintenanceSet.v1",
            Self::BookingRequested { .. } => "BookingRequested.v1",
            Self::BookingApproved { .. } => "BookingApproved.v1",
            Self::BookingRejected { .. } => "BookingRejected.v1",
            Self::BedFreed { .. } => "BedFreed.v1",
            Self::ReviewSubmitted { .. } => "ReviewSubmitted.v1",
        }
    }
}

impl OccupancyEvent {
    /// Serialize for the journal.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if encoding fails.
    pub fn to_serialized(
        &self,
        metadata: Option<serde_json::Value>,
    ) -> Result<SerializedEvent, EventError> {
        SerializedEvent::from_event(self, metadata)
    }

    /// Decode a journal entry.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload is corrupt or
    /// does not match the recorded event type.
    pub fn from_serialized(serialized: &SerializedEvent) -> Result<Self, EventError> {
        let event = Self::from_bytes(&serialized.data)?;
        if event.event_type() != serialized.event_type {
            return Err(EventError::DeserializationError(format!(
                "payload decodes as {} but is recorded as {}",
                event.event_type(),
                serialized.event_type
            )));
        }
        Ok(event)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn event_type_is_versioned() {
        let event = OccupancyEvent::BedFreed {
            bed_id: BedId::new(),
            freed_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "BedFreed.v1");

        let serialized = event.to_serialized(None).unwrap();
        assert_eq!(serialized.event_type, "BedFreed.v1");
        assert_eq!(OccupancyEvent::from_serialized(&serialized).unwrap(), event);
    }

    #[test]
    fn mislabelled_entry_is_rejected() {
        let event = OccupancyEvent::RoomMaintenanceSet {
            room_id: RoomId::new(),
            on: true,
        };
        let mut serialized = event.to_serialized(None).unwrap();
        serialized.event_type = "BedFreed.v1".to_string();

        assert!(matches!(
            OccupancyEvent::from_serialized(&serialized),
            Err(EventError::DeserializationError(_))
        ));
    }
}
