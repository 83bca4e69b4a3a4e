pub mod geo;
pub mod plan;

pub use geo::{BoundingBox, Coordinates, Route};
pub use plan::{
    Budget, Day, Destination, DestinationList, Hotel, ItineraryItem, Plan, PlanParams,
};
