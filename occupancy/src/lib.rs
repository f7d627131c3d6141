//! # Bedspace Occupancy
//!
//! Bed-level occupancy engine for boarding-house and dormitory listings.
//!
//! A property is split into rooms and beds. Tenants request a specific bed;
//! the owner approves or rejects; approved bookings occupy beds, and only
//! tenants with an approved booking may review the property.
//!
//! ## Architecture
//!
//! - **Reducers** ([`aggregates`]): validate commands against
//!   [`OccupancyState`] and commit one [`OccupancyEvent`] per accepted command
//! - **Ledger** ([`OccupancyLedger`]): read-only occupancy answers and an
//!   invariant audit
//! - **Ranking** ([`ranking`]): deterministic listing order
//! - **Engine** ([`OccupancyEngine`]): async facade that serializes writes,
//!   journals events and spawns notifications
//!
//! ## Example
//!
//! ```ignore
//! let engine = OccupancyEngine::new(env);
//! let property = engine.register_property(owner.clone(), details).await?;
//! engine.verify_property(admin, property.id).await?;
//! let (room, beds) = engine.create_room(owner.clone(), property.id, spec).await?;
//! let booking = engine.create_booking_request(tenant, request).await?;
//! engine.decide(owner, booking.id, Decision::Approve).await?;
//! ```

pub mod aggregates;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod ranking;
pub mod state;
pub mod types;

pub use config::Config;
pub use engine::OccupancyEngine;
pub use environment::OccupancyEnvironment;
pub use error::{OccupancyError, Result};
pub use events::OccupancyEvent;
pub use ledger::OccupancyLedger;
pub use notify::{LogNotifier, NotificationKind, Notifier, NotifyError, RecordingNotifier};
pub use state::OccupancyState;
pub use types::*;
