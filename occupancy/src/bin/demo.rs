//! Occupancy engine walkthrough.
//!
//! Lists a property, creates a single-bed room and a double-deck room, and
//! walks a bed through request, contention, approval, review and release.
//! With `DATABASE_URL` set the journal lives in `PostgreSQL` and a second run
//! starts from the replayed state; otherwise it is kept in memory.
//!
//! Run with: `cargo run --bin demo`

use anyhow::Context;
use bedspace_core::environment::SystemClock;
use bedspace_core::event_log::EventLog;
use bedspace_core::stream::StreamId;
use bedspace_occupancy::metrics::register_metrics;
use bedspace_occupancy::{
    Actor, BookingRequest, Config, Decision, Location, LogNotifier, Money, NewProperty, OccupancyEngine,
    OccupancyEnvironment, OccupancyError, RoomLayout, RoomSpec, TenantProfile,
};
use bedspace_postgres::PostgresEventLog;
use bedspace_testing::InMemoryEventLog;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_metrics();
    info!("Starting occupancy demo");

    let env = OccupancyEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(LogNotifier::new(config.notifications.sender.clone())),
    )
    .with_notifications(config.notifications.enabled);

    let engine = build_engine(&config, env).await?;
    run_scenario(&engine).await?;

    engine.settle().await;
    info!("Demo finished");
    Ok(())
}

async fn build_engine(config: &Config, env: OccupancyEnvironment) -> anyhow::Result<OccupancyEngine> {
    if !config.journal.enabled {
        info!("Journal disabled; state lives only in memory");
        return Ok(OccupancyEngine::new(env));
    }

    let log: Arc<dyn EventLog> = match &config.postgres.url {
        Some(url) => {
            let log = PostgresEventLog::connect(url, config.postgres.max_connections)
                .await
                .context("connecting to the journal database")?;
            log.migrate().await.context("migrating the journal schema")?;
            info!("Journal: PostgreSQL");
            Arc::new(log)
        },
        None => {
            info!("Journal: in memory (set DATABASE_URL to persist)");
            Arc::new(InMemoryEventLog::new())
        },
    };

    let engine = OccupancyEngine::restore(env, log, StreamId::new(config.journal.stream.clone()))
        .await
        .context("replaying the journal")?;
    Ok(engine)
}

async fn run_scenario(engine: &OccupancyEngine) -> anyhow::Result<()> {
    let owner = Actor::owner("landlady@casaazul.ph");
    let admin = Actor::admin("review-desk@bedspace.local");
    let ana = Actor::tenant("ana.reyes@example.com");
    let carla = Actor::tenant("carla.santos@example.com");

    let property = engine
        .register_property(
            owner.clone(),
            NewProperty {
                title: "Casa Azul Boarding House".to_string(),
                location: Location {
                    address: "14 Hibbard Ave".to_string(),
                    city: "Dumaguete".to_string(),
                    coordinates: Some((9.3103, 123.3081)),
                },
                price: Money::from_pesos(3500),
                amenities: ["wifi", "laundry", "study area"].into_iter().map(String::from).collect(),
                images: vec!["casa-azul/front.jpg".to_string()],
                featured: false,
            },
        )
        .await?;
    info!(property_id = %property.id, "Property registered (pending verification)");

    engine.verify_property(admin, property.id).await?;

    let (room, beds) = engine
        .create_room(
            owner.clone(),
            property.id,
            RoomSpec {
                room_number: 1,
                name: "Garden Room".to_string(),
                max_beds: 1,
                price_per_bed: Money::from_pesos(2500),
                layout: RoomLayout::Single,
                images: Vec::new(),
            },
        )
        .await?;
    let (bunk_room, bunks) = engine
        .create_room(
            owner.clone(),
            property.id,
            RoomSpec {
                room_number: 2,
                name: String::new(),
                max_beds: 2,
                price_per_bed: Money::from_pesos(1800),
                layout: RoomLayout::DoubleDeck,
                images: Vec::new(),
            },
        )
        .await?;
    info!(room = %room.name, beds = beds.len(), "Single room created");
    info!(room = %bunk_room.name, beds = bunks.len(), "Double-deck room created");

    let bed = beds.first().context("room has no beds")?;
    let request = |email: &str, name: &str| BookingRequest {
        property_id: property.id,
        room_id: room.id,
        bed_id: bed.id,
        tenant: TenantProfile {
            full_name: name.to_string(),
            email: email.to_string(),
            address: "Purok 3".to_string(),
            barangay: "Daro".to_string(),
            municipality: "Dumaguete City".to_string(),
            gender: "female".to_string(),
            age: 20,
            citizenship: "Filipino".to_string(),
            occupation: "Student".to_string(),
        },
        amount: bed.price,
        message: None,
    };

    let booking = engine
        .create_booking_request(ana.clone(), request(&ana.email, "Ana Reyes"))
        .await?;
    info!(booking_id = %booking.id, "Ana requested the bed");

    match engine
        .create_booking_request(carla.clone(), request(&carla.email, "Carla Santos"))
        .await
    {
        Err(OccupancyError::BedUnavailable(bed_id)) => info!(%bed_id, "Carla was refused: bed already held"),
        Err(error) => return Err(error.into()),
        Ok(_) => anyhow::bail!("a held bed accepted a second booking"),
    }

    engine.decide(owner.clone(), booking.id, Decision::Approve).await?;
    let room_after = engine.room(room.id).await?;
    info!(
        occupancy = room_after.current_occupancy,
        status = ?room_after.status,
        "Booking approved"
    );

    let review = engine
        .submit_review(property.id, &ana.email, 4, "Quiet, clean and close to campus.")
        .await?;
    let rated = engine.property(property.id).await?;
    info!(review_id = %review.id, rating = rated.rating, reviews = rated.review_count, "Review accepted");

    engine.free_bed(owner, bed.id).await?;
    let room_after = engine.room(room.id).await?;
    let booking_after = engine.booking(booking.id).await?;
    info!(
        occupancy = room_after.current_occupancy,
        status = ?room_after.status,
        booking_status = %booking_after.status,
        "Bed freed"
    );

    for (position, listing) in engine.ranked_listings().await.iter().enumerate() {
        info!(
            rank = position + 1,
            title = %listing.title,
            bookings = listing.booking_count,
            rating = listing.rating,
            "Listing"
        );
    }

    let violations = engine.violations().await;
    anyhow::ensure!(violations.is_empty(), "inconsistent state: {violations:?}");
    Ok(())
}
