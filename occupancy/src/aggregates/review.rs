//! Review gate and rating aggregation.
//!
//! Only a tenant whose booking at the property was approved may review it.
//! Emails are compared trimmed and case-insensitively. The property's rating
//! and review count are a fold over its verified reviews, so recomputing them
//! any number of times yields the same values.

use super::{commit, reject};
use crate::environment::OccupancyEnvironment;
use crate::error::{OccupancyError, Result};
use crate::events::OccupancyEvent;
use crate::state::OccupancyState;
use crate::types::{Booking, BookingStatus, PropertyId, Review, ReviewId};
use bedspace_core::effect::Effect;
use bedspace_core::reducer::Reducer;
use bedspace_core::{SmallVec, smallvec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Commands for reviews and ratings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ReviewAction {
    /// A tenant reviews a property
    Submit {
        /// Id to assign
        review_id: ReviewId,
        /// Reviewed property
        property_id: PropertyId,
        /// Author email
        email: String,
        /// Stars, 1 to 5
        rating: u8,
        /// Review body
        text: String,
    },

    /// Refold a property's rating and review count
    RecomputeRating {
        /// Property
        property_id: PropertyId,
    },
}

/// Reducer for reviews and ratings
#[derive(Clone, Copy, Debug, Default)]
pub struct ReviewReducer;

impl ReviewReducer {
    /// Creates a new `ReviewReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_submit<'a>(
        state: &'a OccupancyState,
        property_id: &PropertyId,
        email: &str,
        rating: u8,
        now: DateTime<Utc>,
    ) -> Result<&'a Booking> {
        state.property(property_id)?;

        let booking = qualifying_booking(state, property_id, email, now).ok_or_else(|| {
            OccupancyError::ReviewNotAllowed {
                property_id: *property_id,
                email: email.to_string(),
            }
        })?;

        if !(1..=5).contains(&rating) {
            return Err(OccupancyError::validation("rating", "must be between 1 and 5"));
        }
        Ok(booking)
    }
}

/// Latest approved booking at `property_id` for `email` decided no later
/// than `now`.
#[must_use]
pub fn qualifying_booking<'a>(
    state: &'a OccupancyState,
    property_id: &PropertyId,
    email: &str,
    now: DateTime<Utc>,
) -> Option<&'a Booking> {
    let email = normalize_email(email);
    if email.is_empty() {
        return None;
    }

    state
        .bookings
        .values()
        .filter(|b| {
            b.property_id == *property_id
                && b.status == BookingStatus::Approved
                && b.decided_at.is_some_and(|at| at <= now)
                && normalize_email(&b.tenant.email) == email
        })
        .max_by_key(|b| (b.decided_at, b.id))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Reducer for ReviewReducer {
    type State = OccupancyState;
    type Action = ReviewAction;
    type Environment = OccupancyEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            ReviewAction::Submit {
                review_id,
                property_id,
                email,
                rating,
                text,
            } => {
                let now = env.clock.now();
                let booking = match Self::validate_submit(state, &property_id, &email, rating, now) {
                    Ok(booking) => booking,
                    Err(error) => return reject(state, error),
                };

                let review = Review {
                    id: review_id,
                    property_id,
                    booking_id: Some(booking.id),
                    author_name: booking.tenant.full_name.clone(),
                    author_email: email.trim().to_string(),
                    rating,
                    text: text.trim().to_string(),
                    verified: true,
                    created_at: now,
                };
                let event = OccupancyEvent::ReviewSubmitted { review };
                smallvec![commit(state, &event, None)]
            },

            ReviewAction::RecomputeRating { property_id } => {
                if let Err(error) = state.property(&property_id) {
                    return reject(state, error);
                }
                state.recompute_rating(&property_id);
                smallvec![]
            },
        }
    }
}
