mod light;
mod manager;
mod plate;
mod red_light;
mod rule;
mod vehicle;
mod zone;

pub use light::{LightColor, LightState};
pub use manager::{DEFAULT_MIN_PLATE_LENGTH, ViolationManager};
pub use plate::{DEFAULT_VOTE_THRESHOLD, PlateConsensus, normalize_candidate};
pub use red_light::{RED_LIGHT, RED_LIGHT_TURNING, RedLightOptions, RedLightRule};
pub use rule::{RuleContext, ViolationRule};
pub use vehicle::{CrossingSnapshot, Vehicle, VehicleParams, ViolationRecord, ViolationStatus};
pub use zone::{
    Crossing, LineCategory, LineSegment, LineSet, LineZone, Point, Polygon, segments_from_points,
};
