use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair.
///
/// External providers exchange coordinates in `[lng, lat]` order; everything
/// inside this crate is lat-first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Bounding box of a route, converted from the provider's
/// `[minLng, minLat, maxLng, maxLat]` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl BoundingBox {
    pub fn from_lng_lat(bbox: [f64; 4]) -> Self {
        let [min_lng, min_lat, max_lng, max_lat] = bbox;
        Self {
            south_west: Coordinates::new(min_lat, min_lng),
            north_east: Coordinates::new(max_lat, max_lng),
        }
    }
}

/// A resolved route between two coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Route geometry in (lat, lng) order
    pub polyline: Vec<Coordinates>,
    pub bounds: Option<BoundingBox>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_swaps_axis_order() {
        let bounds = BoundingBox::from_lng_lat([139.7, 35.6, 139.8, 35.7]);
        assert_eq!(bounds.south_west, Coordinates::new(35.6, 139.7));
        assert_eq!(bounds.north_east, Coordinates::new(35.7, 139.8));
    }

    #[test]
    fn coordinates_display_rounds_to_four_places() {
        let coords = Coordinates::new(35.68123456, 139.76712345);
        assert_eq!(coords.to_string(), "35.6812, 139.7671");
    }
}
