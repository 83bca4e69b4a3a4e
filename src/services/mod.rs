//! Network-bound pipeline services: generation, parsing, estimation,
//! routing and geolocation.

pub mod directions;
pub mod fare;
pub mod gemini;
pub mod itinerary;
pub mod location;
pub mod parser;
pub mod prompts;
pub mod routing;

pub use directions::{DirectionsService, RouteSearchResult};
pub use fare::{FareCache, FareEstimator};
pub use gemini::{GeminiClient, GeminiConfig, RetryPolicy};
pub use itinerary::{day_count, ItineraryGenerator, PlanRequest};
pub use location::{FixedLocationProvider, LocationProvider, UnavailableLocationProvider};
pub use prompts::Origin;
pub use routing::{
    format_distance, format_duration, FormattedDuration, RouteResolver, RoutingConfig, TravelMode,
};
