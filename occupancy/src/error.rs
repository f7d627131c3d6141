//! Error type returned by every engine operation.

use crate::types::{BedId, BookingId, BookingStatus, PropertyId, UserId};
use thiserror::Error;

/// Rejected preconditions and journal failures.
///
/// Every variant except [`OccupancyError::Journal`] is a synchronous refusal
/// of a command; state is unchanged when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OccupancyError {
    /// A field failed validation
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The property has not been verified by an admin
    #[error("Property {0} is not verified")]
    PropertyNotVerified(PropertyId),

    /// The bed is held, occupied, under maintenance or in a closed room
    #[error("Bed {0} is not available")]
    BedUnavailable(BedId),

    /// The booking is not in a state that allows the transition
    #[error("Booking {booking_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Booking
        booking_id: BookingId,
        /// Current status
        from: BookingStatus,
        /// Requested status
        to: BookingStatus,
    },

    /// The actor may not perform the action
    #[error("User {actor} is not allowed to {action}")]
    Unauthorized {
        /// Acting user
        actor: UserId,
        /// Attempted action
        action: &'static str,
    },

    /// No approved booking entitles this email to review the property
    #[error("{email} has no approved booking at property {property_id}")]
    ReviewNotAllowed {
        /// Property
        property_id: PropertyId,
        /// Would-be author
        email: String,
    },

    /// Unknown id
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Requested id
        id: String,
    },

    /// The event journal could not be read or decoded
    #[error("Journal error: {0}")]
    Journal(String),
}

impl OccupancyError {
    /// Creates a validation error
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Creates a not-found error
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short label for metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::PropertyNotVerified(_) => "property_not_verified",
            Self::BedUnavailable(_) => "bed_unavailable",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Unauthorized { .. } => "unauthorized",
            Self::ReviewNotAllowed { .. } => "review_not_allowed",
            Self::NotFound { .. } => "not_found",
            Self::Journal(_) => "journal",
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, OccupancyError>;
