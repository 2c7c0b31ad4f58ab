//! Timeline engine for trip itineraries: time parsing and formatting,
//! block time ranges, the fitted hour window, per-block layout and
//! validated time edits, with pluggable block storage.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{BootstrapResult, bootstrap_workspace};
pub use application::itinerary_service::ItineraryService;
pub use domain::error::ItineraryError;
pub use domain::layout_config::TimelineConfig;
pub use domain::models::{BlockStatus, BlockType, ItineraryBlock, PlaceSnapshot, TripDay, TripItinerary};
pub use domain::mutation::{BlockPatch, TimeEdit, TimePatch};
pub use domain::timeline::{DayLayout, TimelineLayoutEngine};
pub use infrastructure::block_store::{InMemoryItineraryStore, ItineraryStore, SqliteItineraryStore};
pub use infrastructure::error::InfraError;
pub use infrastructure::postgrest_store::PostgrestItineraryStore;
