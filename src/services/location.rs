//! Geolocation seam.
//!
//! The device position is a one-shot async fetch behind a trait, so hosts
//! plug in whatever source they have.

use async_trait::async_trait;

use crate::error::{PlannerError, Result};
use crate::types::Coordinates;

/// One-shot source of the user's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Provider pinned to explicit coordinates (CLI flag, tests).
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    position: Coordinates,
}

impl FixedLocationProvider {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }

    /// Tokyo Station, a reasonable default origin for domestic trips.
    pub fn tokyo_station() -> Self {
        Self::new(Coordinates::new(35.6812, 139.7671))
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_position(&self) -> Result<Coordinates> {
        Ok(self.position)
    }
}

/// Provider that always fails, for exercising the fail-soft cost path.
#[derive(Debug, Clone, Default)]
pub struct UnavailableLocationProvider;

#[async_trait]
impl LocationProvider for UnavailableLocationProvider {
    async fn current_position(&self) -> Result<Coordinates> {
        Err(PlannerError::LocationUnavailable(
            "no geolocation source configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_provider_returns_its_position() {
        let provider = FixedLocationProvider::new(Coordinates::new(43.0, 142.0));
        let position = provider.current_position().await.unwrap();
        assert_eq!(position, Coordinates::new(43.0, 142.0));
    }

    #[tokio::test]
    async fn unavailable_provider_reports_location_unavailable() {
        let err = UnavailableLocationProvider
            .current_position()
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "LOCATION_UNAVAILABLE");
    }
}
