//! Geocoding and route search against the openrouteservice endpoints.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::types::{BoundingBox, Coordinates, Route};

const DEFAULT_ENDPOINT: &str = "https://api.openrouteservice.org";

/// Travel mode selected by the user.
///
/// The provider has no public-transit profile; `Transit` is routed with the
/// driving profile as an accepted approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    /// Map to the provider profile string.
    pub fn profile(self) -> &'static str {
        match self {
            TravelMode::Driving | TravelMode::Transit => "driving-car",
            TravelMode::Walking => "foot-walking",
            TravelMode::Bicycling => "cycling-regular",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Driving => "DRIVING",
            TravelMode::Walking => "WALKING",
            TravelMode::Bicycling => "BICYCLING",
            TravelMode::Transit => "TRANSIT",
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelMode {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DRIVING" => Ok(TravelMode::Driving),
            "WALKING" => Ok(TravelMode::Walking),
            "BICYCLING" => Ok(TravelMode::Bicycling),
            "TRANSIT" => Ok(TravelMode::Transit),
            other => Err(PlannerError::Config(format!(
                "unknown travel mode `{other}` (expected DRIVING, WALKING, BICYCLING or TRANSIT)"
            ))),
        }
    }
}

/// Connection settings for the routing provider.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub api_key: String,
    pub endpoint: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl RoutingConfig {
    /// Build the config from `ORS_API_KEY`, with an optional
    /// `ORS_BASE_URL` override.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ORS_API_KEY").map_err(|_| {
            PlannerError::Config(
                "ORS_API_KEY environment variable must be set before creating a resolver"
                    .to_string(),
            )
        })?;

        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(endpoint) = std::env::var("ORS_BASE_URL") {
            config.endpoint = endpoint;
        }
        Ok(config)
    }
}

// Provider wire structures. Coordinates arrive in [lng, lat] order.

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodeFeature {
    geometry: PointGeometry,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    coordinates: [f64; 2],
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<DirectionsFeature>,
}

#[derive(Debug, Deserialize)]
struct DirectionsFeature {
    properties: DirectionsProperties,
    geometry: LineGeometry,
    #[serde(default)]
    bbox: Option<[f64; 4]>,
}

#[derive(Debug, Deserialize)]
struct DirectionsProperties {
    summary: DirectionsSummary,
}

#[derive(Debug, Deserialize)]
struct DirectionsSummary {
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: Option<String>,
}

/// Client for the geocoding and directions endpoints.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    http: reqwest::Client,
    config: RoutingConfig,
}

impl RouteResolver {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RoutingConfig::from_env()?))
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    /// Resolve a free-text address to coordinates.
    ///
    /// An empty feature list is a terminal miss for that search.
    pub async fn geocode(&self, address: &str) -> Result<Coordinates> {
        let url = format!("{}/geocode/search", self.endpoint());
        let response = self
            .http
            .get(url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("text", address),
                ("boundary.country", "JP"),
            ])
            .send()
            .await
            .map_err(|err| PlannerError::RoutingFailed(format!("geocoding request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(PlannerError::RoutingFailed(format!(
                "geocoding failed: HTTP {}",
                response.status()
            )));
        }

        let parsed: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| PlannerError::RoutingFailed(format!("geocoding decode failed: {err}")))?;

        match parsed.features.first() {
            Some(feature) => {
                let [lng, lat] = feature.geometry.coordinates;
                Ok(Coordinates::new(lat, lng))
            }
            None => Err(PlannerError::NoResultsFound(address.to_string())),
        }
    }

    /// Fetch a route between two coordinates for the given mode.
    pub async fn route(
        &self,
        start: Coordinates,
        end: Coordinates,
        mode: TravelMode,
    ) -> Result<Route> {
        let url = format!("{}/v2/directions/{}", self.endpoint(), mode.profile());
        let body = DirectionsRequest {
            coordinates: [[start.lng, start.lat], [end.lng, end.lat]],
        };

        let response = self
            .http
            .post(url)
            .header("Authorization", self.config.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|err| PlannerError::RoutingFailed(format!("directions request failed: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| PlannerError::RoutingFailed(format!("failed to read response: {err}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderError>(&text)
                .ok()
                .and_then(|e| e.error)
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(PlannerError::RoutingFailed(format!(
                "directions failed: HTTP {status} - {message}"
            )));
        }

        let parsed: DirectionsResponse = serde_json::from_str(&text)
            .map_err(|err| PlannerError::RoutingFailed(format!("directions decode failed: {err}")))?;

        let feature = parsed
            .features
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::RoutingFailed("empty directions response".to_string()))?;

        debug!(
            target: "trip_planner::routing",
            distance = feature.properties.summary.distance,
            duration = feature.properties.summary.duration,
            "route resolved"
        );

        Ok(Route {
            distance_meters: feature.properties.summary.distance,
            duration_seconds: feature.properties.summary.duration,
            polyline: feature
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| Coordinates::new(lat, lng))
                .collect(),
            bounds: feature.bbox.map(BoundingBox::from_lng_lat),
        })
    }
}

/// Duration split into display units. Renders as "1時間30分" or "45分".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattedDuration {
    pub hours: u64,
    pub minutes: u64,
}

impl std::fmt::Display for FormattedDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hours > 0 {
            write!(f, "{}時間{}分", self.hours, self.minutes)
        } else {
            write!(f, "{}分", self.minutes)
        }
    }
}

/// Format a distance in meters: kilometers to one decimal from 1000 m up,
/// whole meters below.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

/// Split a duration in seconds into hours and minutes.
pub fn format_duration(seconds: f64) -> FormattedDuration {
    let total = seconds.max(0.0) as u64;
    FormattedDuration {
        hours: total / 3600,
        minutes: (total % 3600) / 60,
    }
}
