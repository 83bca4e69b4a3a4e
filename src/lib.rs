//! trip-planner-rs: AI-assisted travel itinerary planning
//!
//! This library drives a four-stage wizard (activity → destination →
//! details → plan) over an AI text-generation endpoint and a
//! routing/geocoding provider: prompts out, strict schema-checked JSON
//! back, transport costs reconciled against the travel budget, finished
//! plans persisted locally and shareable as a URL-safe payload.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trip_planner_rs::{
//!     FareEstimator, FixedLocationProvider, GeminiClient, ItineraryGenerator,
//!     MemoryStore, PlanStore, Wizard,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(GeminiClient::from_env()?);
//!     let mut wizard = Wizard::new(
//!         ItineraryGenerator::new(Arc::clone(&client)),
//!         FareEstimator::new(client),
//!         Arc::new(FixedLocationProvider::tokyo_station()),
//!         PlanStore::new(Arc::new(MemoryStore::new())),
//!     );
//!
//!     wizard.submit_activity("スキー")?;
//!     let suggestions = wizard.load_destinations().await?;
//!     println!("{} destinations suggested", suggestions.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod schemas;
pub mod services;
pub mod storage;
pub mod types;
pub mod wizard;

pub use error::{FieldError, PlannerError, Result};
pub use schemas::{ResponseSchema, SchemaHandle};
pub use services::{
    day_count, format_distance, format_duration, DirectionsService, FareCache, FareEstimator,
    FixedLocationProvider, FormattedDuration, GeminiClient, GeminiConfig, ItineraryGenerator,
    LocationProvider, Origin, PlanRequest, RetryPolicy, RouteResolver, RouteSearchResult,
    RoutingConfig, TravelMode,
};
pub use storage::{
    decode_shared_plan, encode_for_sharing, FavoritesStore, FileStore, HistoryStore, KvStore,
    MemoryStore, PlanStore, SavedPlanRecord,
};
pub use types::{
    Budget, Coordinates, Day, Destination, Hotel, ItineraryItem, Plan, PlanParams, Route,
};
pub use wizard::{BootstrapQuery, CostRequest, CostUpdate, Stage, Wizard, WizardParams};

#[cfg(feature = "cli")]
pub mod cli;
