//! Domain types for the occupancy engine.
//!
//! Value objects, entities and command payloads shared by every reducer.
//! Entities are plain data; all mutation goes through
//! [`OccupancyState::apply`](crate::state::OccupancyState::apply).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a property listing
    PropertyId
);
uuid_id!(
    /// Unique identifier for a room
    RoomId
);
uuid_id!(
    /// Unique identifier for a bed
    BedId
);
uuid_id!(
    /// Unique identifier for a booking request
    BookingId
);
uuid_id!(
    /// Unique identifier for a review
    ReviewId
);
uuid_id!(
    /// Unique identifier for a user supplied by the identity provider
    UserId
);

// ============================================================================
// Value Objects
// ============================================================================

/// Money amount in centavos.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a new `Money` from centavos
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a new `Money` from whole pesos
    #[must_use]
    pub const fn from_pesos(pesos: u64) -> Self {
        Self(pesos.saturating_mul(100))
    }

    /// Returns the amount in centavos
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₱{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Where a property is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Street address
    pub address: String,
    /// City or municipality
    pub city: String,
    /// Optional `(latitude, longitude)`
    pub coordinates: Option<(f64, f64)>,
}

impl Location {
    /// Whether the coordinates, if any, are a finite point on the globe.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.coordinates.is_none_or(|(lat, lon)| {
            lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
        })
    }
}

/// Role granted by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Looks for and books beds
    Tenant,
    /// Lists properties and decides on bookings
    Owner,
    /// Verifies properties
    Admin,
}

/// The authenticated caller of a write operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id
    pub user_id: UserId,
    /// Login email
    pub email: String,
    /// Granted role
    pub role: Role,
}

impl Actor {
    /// Creates an actor with a fresh user id
    #[must_use]
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(),
            email: email.into(),
            role,
        }
    }

    /// Creates a tenant actor
    #[must_use]
    pub fn tenant(email: impl Into<String>) -> Self {
        Self::new(email, Role::Tenant)
    }

    /// Creates an owner actor
    #[must_use]
    pub fn owner(email: impl Into<String>) -> Self {
        Self::new(email, Role::Owner)
    }

    /// Creates an admin actor
    #[must_use]
    pub fn admin(email: impl Into<String>) -> Self {
        Self::new(email, Role::Admin)
    }
}

// ============================================================================
// Status Enums
// ============================================================================

/// Listing lifecycle status of a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyStatus {
    /// Registered, awaiting verification
    Pending,
    /// Listed and open for bookings
    Available,
    /// Hidden by its owner
    Inactive,
}

/// Status of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    /// At least one bed is not occupied
    Available,
    /// Every bed is occupied
    Full,
    /// Closed by the owner
    Maintenance,
}

/// Bed arrangement of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomLayout {
    /// One bed per slot
    Single,
    /// Bunk frames, each holding a lower and an upper bed
    DoubleDeck,
}

/// Kind of bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedType {
    /// Standalone bed
    Single,
    /// Top bunk of a double-deck frame
    DoubleDeckUpper,
    /// Bottom bunk of a double-deck frame
    DoubleDeckLower,
}

/// Status of a bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedStatus {
    /// Free
    Available,
    /// An approved booking occupies it
    Occupied,
    /// Closed by the owner
    Maintenance,
}

/// Status of a booking request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Waiting for the owner's decision
    Pending,
    /// Accepted by the owner (terminal)
    Approved,
    /// Declined by the owner (terminal)
    Rejected,
}

impl BookingStatus {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// An owner's verdict on a pending booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Accept the booking and occupy the bed
    Approve,
    /// Decline the booking and release the bed
    Reject,
}

impl Decision {
    /// Booking status this decision leads to
    #[must_use]
    pub const fn target_status(self) -> BookingStatus {
        match self {
            Self::Approve => BookingStatus::Approved,
            Self::Reject => BookingStatus::Rejected,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A rental listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property ID
    pub id: PropertyId,
    /// Owning user
    pub owner_id: UserId,
    /// Owner contact email, used for booking notifications
    pub owner_email: String,
    /// Listing title
    pub title: String,
    /// Location
    pub location: Location,
    /// Advertised monthly price
    pub price: Money,
    /// Amenity names
    pub amenities: BTreeSet<String>,
    /// Opaque image references
    pub images: Vec<String>,
    /// Only verified properties accept bookings
    pub verified: bool,
    /// Listing lifecycle status
    pub status: PropertyStatus,
    /// Promoted in rankings
    pub featured: bool,
    /// When registered
    pub created_at: DateTime<Utc>,
    /// Mean of verified review ratings, one decimal (derived)
    pub rating: f64,
    /// Number of verified reviews (derived)
    pub review_count: u32,
    /// Number of approved bookings (derived)
    pub booking_count: u32,
}

/// A room within a property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room ID
    pub id: RoomId,
    /// Parent property
    pub property_id: PropertyId,
    /// Number unique within the property
    pub room_number: u32,
    /// Display name
    pub name: String,
    /// Number of beds in the room
    pub max_beds: u32,
    /// Price of one bed
    pub price_per_bed: Money,
    /// Room status (derived unless in maintenance)
    pub status: RoomStatus,
    /// Number of occupied beds (derived)
    pub current_occupancy: u32,
    /// Bed arrangement
    pub layout: RoomLayout,
    /// Opaque image references
    pub images: Vec<String>,
}

/// A single bookable bed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    /// Bed ID
    pub id: BedId,
    /// Parent room
    pub room_id: RoomId,
    /// Property of the parent room
    pub property_id: PropertyId,
    /// Number unique within the room, starting at 1
    pub bed_number: u32,
    /// Kind of bed
    pub bed_type: BedType,
    /// Sibling bunk on the same double-deck frame
    pub pair: Option<BedId>,
    /// Bed status
    pub status: BedStatus,
    /// Price of the bed
    pub price: Money,
    /// Pending booking currently holding the bed
    pub held_by: Option<BookingId>,
    /// Approved booking currently occupying the bed
    pub occupied_by: Option<BookingId>,
}

/// Identity a tenant submits with a booking request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    /// Full name
    pub full_name: String,
    /// Contact email
    pub email: String,
    /// Home address
    pub address: String,
    /// Barangay
    pub barangay: String,
    /// Municipality or city
    pub municipality: String,
    /// Gender
    pub gender: String,
    /// Age in years
    pub age: u8,
    /// Citizenship
    pub citizenship: String,
    /// Occupation
    pub occupation: String,
}

/// A tenant's request to occupy one bed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Requested property
    pub property_id: PropertyId,
    /// Requested room
    pub room_id: RoomId,
    /// Requested bed
    pub bed_id: BedId,
    /// Requesting user
    pub tenant_id: UserId,
    /// Tenant identity as submitted
    pub tenant: TenantProfile,
    /// Optional note to the owner
    pub message: Option<String>,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Amount quoted at request time
    pub total_amount: Money,
    /// When requested
    pub created_at: DateTime<Utc>,
    /// When approved or rejected
    pub decided_at: Option<DateTime<Utc>>,
}

/// A tenant review of a property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review ID
    pub id: ReviewId,
    /// Reviewed property
    pub property_id: PropertyId,
    /// Approved booking that made the author eligible
    pub booking_id: Option<BookingId>,
    /// Author display name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Stars, 1 to 5
    pub rating: u8,
    /// Review body
    pub text: String,
    /// Backed by an approved booking
    pub verified: bool,
    /// When submitted
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Command Payloads
// ============================================================================

/// Fields an owner supplies to list a property.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    /// Listing title
    pub title: String,
    /// Location
    pub location: Location,
    /// Advertised monthly price
    pub price: Money,
    /// Amenity names
    pub amenities: BTreeSet<String>,
    /// Opaque image references
    pub images: Vec<String>,
    /// Promoted in rankings
    pub featured: bool,
}

/// Partial edit of a listing. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingUpdate {
    /// New price
    pub price: Option<Money>,
    /// Replacement amenity set
    pub amenities: Option<BTreeSet<String>>,
    /// New lifecycle status
    pub status: Option<PropertyStatus>,
    /// New featured flag
    pub featured: Option<bool>,
    /// Replacement image list
    pub images: Option<Vec<String>>,
}

/// Shape of a room to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    /// Number unique within the property
    pub room_number: u32,
    /// Display name; blank defaults to `Room {room_number}`
    pub name: String,
    /// Bed count for single layouts, frame count for double-deck layouts
    pub max_beds: u32,
    /// Price of one bed
    pub price_per_bed: Money,
    /// Bed arrangement
    pub layout: RoomLayout,
    /// Opaque image references
    pub images: Vec<String>,
}

/// A tenant's booking request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Property to book in
    pub property_id: PropertyId,
    /// Room to book in
    pub room_id: RoomId,
    /// Bed to hold
    pub bed_id: BedId,
    /// Tenant identity
    pub tenant: TenantProfile,
    /// Quoted amount
    pub amount: Money,
    /// Optional note to the owner
    pub message: Option<String>,
}

/// A bed with its derived bookability, as shown to tenants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedListing {
    /// The bed
    pub bed: Bed,
    /// Whether a booking request for this bed would be accepted
    pub bookable: bool,
}
