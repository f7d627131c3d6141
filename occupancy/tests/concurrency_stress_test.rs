//! Concurrent access to the engine.
//!
//! Bed contention must resolve to exactly one winner, and no interleaving of
//! requests, decisions and releases may break the ledger invariants.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

mod common;

use bedspace_occupancy::{Actor, BookingStatus, Decision, OccupancyError, RoomLayout};
use common::{booking_request, harness};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_bed_many_tenants() {
    let h = harness();
    let property = h.verified_property("Casa Azul").await;
    let (room, beds) = h.room(&property, 1, 1, RoomLayout::Single).await;
    let bed = beds[0].clone();

    let mut handles = vec![];
    for i in 0..100 {
        let engine = h.engine.clone();
        let request = booking_request(&property, &room, &bed, &format!("Tenant {i}"), &format!("t{i}@example.com"));
        handles.push(tokio::spawn(async move {
            engine
                .create_booking_request(Actor::tenant(&format!("t{i}@example.com")), request)
                .await
        }));
    }

    let mut wins = 0;
    let mut refusals = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => {
                assert_eq!(booking.status, BookingStatus::Pending);
                wins += 1;
            },
            Err(OccupancyError::BedUnavailable(id)) => {
                assert_eq!(id, bed.id);
                refusals += 1;
            },
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(refusals, 99);
    assert_eq!(h.engine.bookings_for_property(property.id).await.unwrap().len(), 1);
    assert!(h.engine.violations().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_requests_for_distinct_beds_all_succeed() {
    let h = harness();
    let property = h.verified_property("Casa Azul").await;
    let (room, beds) = h.room(&property, 1, 10, RoomLayout::DoubleDeck).await;

    let mut handles = vec![];
    for (i, bed) in beds.iter().enumerate() {
        let engine = h.engine.clone();
        let email = format!("t{i}@example.com");
        let request = booking_request(&property, &room, bed, &format!("Tenant {i}"), &email);
        handles.push(tokio::spawn(async move {
            engine.create_booking_request(Actor::tenant(&email), request).await
        }));
    }

    let mut bookings = vec![];
    for handle in handles {
        bookings.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(bookings.len(), 20);

    let mut decisions = vec![];
    for (i, booking) in bookings.into_iter().enumerate() {
        let engine = h.engine.clone();
        let owner = h.owner.clone();
        let decision = if i % 2 == 0 { Decision::Approve } else { Decision::Reject };
        decisions.push(tokio::spawn(async move { engine.decide(owner, booking.id, decision).await }));
    }
    for handle in decisions {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.engine.occupied_beds_in_room(room.id).await.unwrap(), 10);
    assert_eq!(h.engine.property(property.id).await.unwrap().booking_count, 10);
    assert!(h.engine.violations().await.is_empty());
}

/// Approvals and releases racing on the same beds never leave a bed with
/// two occupants or an occupant without an approved booking.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_approve_and_free() {
    let h = harness();
    let property = h.verified_property("Casa Azul").await;
    let (room, beds) = h.room(&property, 1, 5, RoomLayout::Single).await;

    for round in 0..5 {
        let mut pending = vec![];
        for (i, bed) in beds.iter().enumerate() {
            let email = format!("r{round}b{i}@example.com");
            let booking = h
                .engine
                .create_booking_request(
                    Actor::tenant(&email),
                    booking_request(&property, &room, bed, "Round Tenant", &email),
                )
                .await
                .unwrap();
            pending.push((booking.id, bed.id));
        }

        let mut handles = vec![];
        for (booking_id, bed_id) in pending {
            let approver = h.engine.clone();
            let releaser = h.engine.clone();
            let owner = h.owner.clone();
            let owner_again = h.owner.clone();
            handles.push(tokio::spawn(async move {
                approver.decide(owner, booking_id, Decision::Approve).await.map(|_| ())
            }));
            handles.push(tokio::spawn(async move {
                releaser.free_bed(owner_again, bed_id).await.map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(h.engine.violations().await.is_empty(), "round {round}");

        // Release whatever is still occupied before the next round
        for bed in &beds {
            h.engine.free_bed(h.owner.clone(), bed.id).await.unwrap();
        }
    }

    assert_eq!(h.engine.occupied_beds_in_room(room.id).await.unwrap(), 0);
    assert_eq!(h.engine.property(property.id).await.unwrap().booking_count, 25);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reviews_fold_every_rating() {
    let h = harness();
    let property = h.verified_property("Casa Azul").await;
    let (room, beds) = h.room(&property, 1, 4, RoomLayout::Single).await;

    let mut emails = vec![];
    for (i, bed) in beds.iter().enumerate() {
        let email = format!("t{i}@example.com");
        let booking = h
            .engine
            .create_booking_request(Actor::tenant(&email), booking_request(&property, &room, bed, "Tenant", &email))
            .await
            .unwrap();
        h.engine.decide(h.owner.clone(), booking.id, Decision::Approve).await.unwrap();
        emails.push(email);
    }

    let property_id = property.id;
    let mut handles = vec![];
    for (i, email) in emails.into_iter().enumerate() {
        let engine = h.engine.clone();
        let rating = u8::try_from(i % 5 + 1).unwrap();
        handles.push(tokio::spawn(async move {
            engine.submit_review(property_id, &email, rating, "ok").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Ratings 1, 2, 3, 4
    let property = h.engine.property(property_id).await.unwrap();
    assert_eq!(property.review_count, 4);
    assert!((property.rating - 2.5).abs() < f64::EPSILON);
}
