//! Route search combining geocoding, directions and fare estimation.
//!
//! Mirrors the standalone route-search flow: both endpoints are geocoded
//! first, so a geocoding miss short-circuits before any directions call;
//! the fare lookup runs last and is fail-soft.

use crate::error::Result;
use crate::services::fare::FareEstimator;
use crate::services::routing::{
    format_distance, format_duration, FormattedDuration, RouteResolver, TravelMode,
};
use crate::types::{Coordinates, Route};

/// A resolved route with display strings and an advisory fare.
#[derive(Debug, Clone)]
pub struct RouteSearchResult {
    pub origin: Coordinates,
    pub destination: Coordinates,
    pub route: Route,
    pub distance_text: String,
    pub duration: FormattedDuration,
    /// "1500円", or a marker string when the fare could not be determined
    pub fare_text: String,
}

/// Route search front door over the resolver and the fare estimator.
#[derive(Debug, Clone)]
pub struct DirectionsService {
    resolver: RouteResolver,
    fares: FareEstimator,
}

impl DirectionsService {
    pub fn new(resolver: RouteResolver, fares: FareEstimator) -> Self {
        Self { resolver, fares }
    }

    pub async fn search(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<RouteSearchResult> {
        let start = self.resolver.geocode(origin).await?;
        let end = self.resolver.geocode(destination).await?;

        let route = self.resolver.route(start, end, mode).await?;
        let fare_text = self.fares.estimate_fare(origin, destination, mode).await;

        Ok(RouteSearchResult {
            origin: start,
            destination: end,
            distance_text: format_distance(route.distance_meters),
            duration: format_duration(route.duration_seconds),
            fare_text,
            route,
        })
    }
}
