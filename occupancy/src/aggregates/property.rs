//! Property listings: registration, admin verification and owner edits.

use super::{commit, owned_property, reject};
use crate::environment::OccupancyEnvironment;
use crate::error::{OccupancyError, Result};
use crate::events::OccupancyEvent;
use crate::state::OccupancyState;
use crate::types::{Actor, ListingUpdate, NewProperty, Property, PropertyId, PropertyStatus, Role};
use bedspace_core::effect::Effect;
use bedspace_core::reducer::Reducer;
use bedspace_core::{SmallVec, smallvec};
use serde::{Deserialize, Serialize};

/// Commands for property listings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PropertyAction {
    /// An owner lists a new property
    Register {
        /// Id to assign
        property_id: PropertyId,
        /// Listing owner
        actor: Actor,
        /// Listing fields
        details: NewProperty,
    },

    /// An admin marks a property as verified
    Verify {
        /// Verifying admin
        actor: Actor,
        /// Property
        property_id: PropertyId,
    },

    /// The owner edits a listing
    UpdateListing {
        /// Listing owner
        actor: Actor,
        /// Property
        property_id: PropertyId,
        /// Fields to change
        update: ListingUpdate,
    },
}

/// Reducer for property listings
#[derive(Clone, Copy, Debug, Default)]
pub struct PropertyReducer;

impl PropertyReducer {
    /// Creates a new `PropertyReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_register(actor: &Actor, details: &NewProperty) -> Result<()> {
        if actor.role != Role::Owner {
            return Err(OccupancyError::Unauthorized {
                actor: actor.user_id,
                action: "register a property",
            });
        }
        if details.title.trim().is_empty() {
            return Err(OccupancyError::validation("title", "is required"));
        }
        if details.price.is_zero() {
            return Err(OccupancyError::validation("price", "must be greater than zero"));
        }
        // Non-finite values would be journaled as null and could not be replayed
        if !details.location.has_valid_coordinates() {
            return Err(OccupancyError::validation(
                "coordinates",
                "must be a finite latitude in [-90, 90] and longitude in [-180, 180]",
            ));
        }
        Ok(())
    }

    fn validate_verify(state: &OccupancyState, actor: &Actor, property_id: &PropertyId) -> Result<()> {
        if actor.role != Role::Admin {
            return Err(OccupancyError::Unauthorized {
                actor: actor.user_id,
                action: "verify a property",
            });
        }
        state.property(property_id)?;
        Ok(())
    }

    fn validate_update(
        state: &OccupancyState,
        actor: &Actor,
        property_id: &PropertyId,
        update: &ListingUpdate,
    ) -> Result<()> {
        let property = owned_property(state, actor, property_id, "edit this listing")?;
        if update.price.is_some_and(|price| price.is_zero()) {
            return Err(OccupancyError::validation("price", "must be greater than zero"));
        }
        if update.status == Some(PropertyStatus::Available) && !property.verified {
            return Err(OccupancyError::validation(
                "status",
                "an unverified property cannot be listed as available",
            ));
        }
        Ok(())
    }
}

impl Reducer for PropertyReducer {
    type State = OccupancyState;
    type Action = PropertyAction;
    type Environment = OccupancyEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            PropertyAction::Register {
                property_id,
                actor,
                details,
            } => {
                if let Err(error) = Self::validate_register(&actor, &details) {
                    return reject(state, error);
                }

                let property = Property {
                    id: property_id,
                    owner_id: actor.user_id,
                    owner_email: actor.email.clone(),
                    title: details.title.trim().to_string(),
                    location: details.location,
                    price: details.price,
                    amenities: details.amenities,
                    images: details.images,
                    verified: false,
                    status: PropertyStatus::Pending,
                    featured: details.featured,
                    created_at: env.clock.now(),
                    rating: 0.0,
                    review_count: 0,
                    booking_count: 0,
                };
                let event = OccupancyEvent::PropertyRegistered { property };
                smallvec![commit(state, &event, Some(&actor))]
            },

            PropertyAction::Verify { actor, property_id } => {
                if let Err(error) = Self::validate_verify(state, &actor, &property_id) {
                    return reject(state, error);
                }

                let event = OccupancyEvent::PropertyVerified {
                    property_id,
                    verified_at: env.clock.now(),
                };
                smallvec![commit(state, &event, Some(&actor))]
            },

            PropertyAction::UpdateListing {
                actor,
                property_id,
                update,
            } => {
                if let Err(error) = Self::validate_update(state, &actor, &property_id, &update) {
                    return reject(state, error);
                }

                let event = OccupancyEvent::ListingUpdated { property_id, update };
                smallvec![commit(state, &event, Some(&actor))]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::aggregates::fixtures::{environment, world};
    use crate::types::{Location, Money};
    use bedspace_testing::{ReducerTest, assertions, epoch};

    fn new_property() -> NewProperty {
        NewProperty {
            title: "  Casa Verde ".to_string(),
            location: Location {
                address: "Hibbard Ave".to_string(),
                city: "Dumaguete".to_string(),
                coordinates: Some((9.3068, 123.3054)),
            },
            price: Money::from_pesos(4500),
            ..NewProperty::default()
        }
    }

    #[test]
    fn owner_registers_pending_unverified_property() {
        let owner = Actor::owner("owner@example.com");
        let owner_id = owner.user_id;
        let property_id = PropertyId::new();

        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(OccupancyState::new())
            .when_action(PropertyAction::Register {
                property_id,
                actor: owner,
                details: new_property(),
            })
            .then_state(move |state| {
                let property = state.property(&property_id).unwrap();
                assert_eq!(property.title, "Casa Verde");
                assert_eq!(property.owner_id, owner_id);
                assert_eq!(property.status, PropertyStatus::Pending);
                assert!(!property.verified);
                assert_eq!(property.created_at, epoch());
            })
            .then_effects(|effects| {
                assertions::assert_appended(effects, &["PropertyRegistered.v1"]);
            })
            .run();
    }

    #[test]
    fn tenant_cannot_register_property() {
        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(OccupancyState::new())
            .when_action(PropertyAction::Register {
                property_id: PropertyId::new(),
                actor: Actor::tenant("tenant@example.com"),
                details: new_property(),
            })
            .then_state(|state| {
                assert!(state.properties.is_empty());
                assert!(matches!(state.last_error, Some(OccupancyError::Unauthorized { .. })));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn zero_price_is_rejected() {
        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(OccupancyState::new())
            .when_action(PropertyAction::Register {
                property_id: PropertyId::new(),
                actor: Actor::owner("owner@example.com"),
                details: NewProperty {
                    price: Money::default(),
                    ..new_property()
                },
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(OccupancyError::validation("price", "must be greater than zero"))
                );
            })
            .run();
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        for coordinates in [(f64::NAN, 123.0), (9.3, f64::INFINITY), (91.0, 123.0), (9.3, -180.5)] {
            let mut details = new_property();
            details.location.coordinates = Some(coordinates);

            ReducerTest::new(PropertyReducer::new())
                .with_env(environment())
                .given_state(OccupancyState::new())
                .when_action(PropertyAction::Register {
                    property_id: PropertyId::new(),
                    actor: Actor::owner("owner@example.com"),
                    details,
                })
                .then_state(|state| {
                    assert!(matches!(
                        state.last_error,
                        Some(OccupancyError::Validation { field: "coordinates", .. })
                    ));
                    assert!(state.properties.is_empty());
                })
                .then_effects(assertions::assert_no_effects)
                .run();
        }
    }

    #[test]
    fn boundary_coordinates_are_accepted() {
        let mut details = new_property();
        details.location.coordinates = Some((-90.0, 180.0));

        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(OccupancyState::new())
            .when_action(PropertyAction::Register {
                property_id: PropertyId::new(),
                actor: Actor::owner("owner@example.com"),
                details,
            })
            .then_state(|state| {
                assert!(state.last_error.is_none());
                assert_eq!(state.properties.len(), 1);
            })
            .run();
    }

    #[test]
    fn admin_verification_makes_listing_available() {
        let owner = Actor::owner("owner@example.com");
        let property_id = PropertyId::new();

        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(OccupancyState::new())
            .when_action(PropertyAction::Register {
                property_id,
                actor: owner,
                details: new_property(),
            })
            .when_action(PropertyAction::Verify {
                actor: Actor::admin("admin@example.com"),
                property_id,
            })
            .then_state(move |state| {
                let property = state.property(&property_id).unwrap();
                assert!(property.verified);
                assert_eq!(property.status, PropertyStatus::Available);
            })
            .then_effects(|effects| {
                assertions::assert_appended(effects, &["PropertyVerified.v1"]);
            })
            .run();
    }

    #[test]
    fn only_admins_verify() {
        let w = world(1);
        let property_id = w.property_id;

        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(PropertyAction::Verify {
                actor: w.owner,
                property_id,
            })
            .then_state(|state| {
                assert!(matches!(state.last_error, Some(OccupancyError::Unauthorized { .. })));
            })
            .run();
    }

    #[test]
    fn owner_updates_listing_fields() {
        let w = world(1);
        let property_id = w.property_id;

        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(PropertyAction::UpdateListing {
                actor: w.owner,
                property_id,
                update: ListingUpdate {
                    price: Some(Money::from_pesos(5000)),
                    featured: Some(true),
                    amenities: Some(["wifi".to_string()].into_iter().collect()),
                    ..ListingUpdate::default()
                },
            })
            .then_state(move |state| {
                let property = state.property(&property_id).unwrap();
                assert_eq!(property.price, Money::from_pesos(5000));
                assert!(property.featured);
                assert!(property.amenities.contains("wifi"));
                assert_eq!(property.title, "Casa Azul");
            })
            .then_effects(|effects| {
                assertions::assert_appended(effects, &["ListingUpdated.v1"]);
            })
            .run();
    }

    #[test]
    fn unverified_property_cannot_be_made_available() {
        let owner = Actor::owner("owner@example.com");
        let property_id = PropertyId::new();

        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(OccupancyState::new())
            .when_action(PropertyAction::Register {
                property_id,
                actor: owner.clone(),
                details: new_property(),
            })
            .when_action(PropertyAction::UpdateListing {
                actor: owner,
                property_id,
                update: ListingUpdate {
                    status: Some(PropertyStatus::Available),
                    ..ListingUpdate::default()
                },
            })
            .then_state(move |state| {
                assert!(matches!(
                    state.last_error,
                    Some(OccupancyError::Validation { field: "status", .. })
                ));
                assert_eq!(state.property(&property_id).unwrap().status, PropertyStatus::Pending);
            })
            .run();
    }

    #[test]
    fn strangers_cannot_edit_listing() {
        let w = world(1);

        ReducerTest::new(PropertyReducer::new())
            .with_env(environment())
            .given_state(w.state)
            .when_action(PropertyAction::UpdateListing {
                actor: Actor::owner("someone-else@example.com"),
                property_id: w.property_id,
                update: ListingUpdate::default(),
            })
            .then_state(|state| {
                assert!(matches!(state.last_error, Some(OccupancyError::Unauthorized { .. })));
            })
            .run();
    }
}
