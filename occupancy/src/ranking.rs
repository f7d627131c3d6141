//! Listing order for the public property catalogue.
//!
//! Most-booked first, then featured listings, then higher rating, then newer
//! listings. The property id breaks any remaining tie, so the order is total
//! and the same input always ranks the same way.

use crate::types::Property;
use std::cmp::Ordering;

/// Compares two properties in ranking order.
#[must_use]
pub fn compare(a: &Property, b: &Property) -> Ordering {
    b.booking_count
        .cmp(&a.booking_count)
        .then_with(|| b.featured.cmp(&a.featured))
        .then_with(|| b.rating.total_cmp(&a.rating))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts properties into ranking order.
#[must_use]
pub fn rank(mut properties: Vec<Property>) -> Vec<Property> {
    properties.sort_by(compare);
    properties
}
