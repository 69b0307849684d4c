//! # Trip Journal Core
//!
//! Persistence, query, and change-notification core of a travel-journal
//! application. The host renders screens; this crate owns everything
//! underneath them:
//!
//! - **Record store**: trips, photos, and locations in an embedded SQLite
//!   file, mutated through isolated editing contexts with child-context
//!   nesting, save, and rollback.
//! - **Queries**: composable trip filters (all, favorites, category,
//!   case-insensitive title search) plus capped recent-trips variants,
//!   always ordered newest first.
//! - **Change notification**: every save broadcasts a change set;
//!   observers re-run their query and emit minimal snapshot transitions
//!   (insert/remove/move/reconfigure) for diffable rendering.
//! - **Images**: thumbnail generation and cancellable background import of
//!   picker results.
//! - **Seeding**: one-time sample trips from a JSON file on first launch.
//!
//! ## Example
//!
//! ```no_run
//! use triplog::{PlaceSelection, Store, TripQuery};
//!
//! # fn main() -> Result<(), triplog::PersistenceError> {
//! let store = Store::open(std::path::Path::new("trips.db"))?;
//! store.initialize()?;
//!
//! let mut context = store.new_context();
//! let mut trip = context.new_trip();
//! trip.title = "Kakadu Adventure".to_string();
//! context.update_trip(&trip);
//! context.set_location(trip.id, PlaceSelection {
//!     name: "Kakadu".to_string(),
//!     latitude: -12.84,
//!     longitude: 132.71,
//!     formatted_address: "Kakadu NT, Australia".to_string(),
//! })?;
//! store.save(&mut context)?;
//!
//! let recent = store.fetch_trips(&TripQuery::recent())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod model;
pub mod notify;
pub mod observer;
pub mod query;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod thumbnails;

// Re-exports
pub use config::Config;
pub use error::{PersistenceError, SeedError, ThumbnailError};
pub use import::{ImportTask, ImportUpdate, ImportedImage, PickedImage};
pub use model::{
    Location, LocationId, Photo, PhotoId, PlaceSelection, Trip, TripCategory, TripId,
};
pub use notify::{ChangeSet, EntityChanges, StoreEvent, SubscriptionHandle};
pub use observer::{TripListObserver, TripPhotosObserver};
pub use query::{TripFilter, TripQuery, RECENT_TRIPS_LIMIT};
pub use snapshot::{
    Snapshot, SnapshotTransition, TripDetailItem, TripDetailSection, TripGridSection,
};
pub use store::{EditContext, Store};
