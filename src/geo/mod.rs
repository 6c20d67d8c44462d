//! Geographic helpers
//!
//! Converts projected SVY21 coordinates from the car park information export
//! into WGS84 latitude/longitude, and measures great-circle distances between
//! WGS84 points.

mod convert;
mod distance;

pub use convert::{svy21_to_wgs84, wgs84_to_svy21};
pub use distance::{EARTH_RADIUS_KM, haversine_km};
