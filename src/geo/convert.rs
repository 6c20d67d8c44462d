//! SVY21 → WGS84 conversion.
//!
//! The car park export stores positions in SVY21, Singapore's transverse
//! Mercator grid. Over the island the grid is close enough to an
//! equirectangular projection that a linear approximation around the SVY21
//! origin stays within a few metres, which is far below the resolution that
//! matters for "nearest car park".

/// Latitude of the SVY21 projection origin, in degrees (1°22'N).
const ORIGIN_LATITUDE: f64 = 1.366666;

/// Longitude of the SVY21 projection origin, in degrees (103°50'E).
const ORIGIN_LONGITUDE: f64 = 103.833333;

/// Northing assigned to the origin, in metres.
const FALSE_NORTHING: f64 = 38744.572;

/// Easting assigned to the origin, in metres.
const FALSE_EASTING: f64 = 28001.642;

/// Metres per degree of latitude near the equator.
const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;

/// Metres per degree of longitude at the equator; scaled by cos(latitude).
const METERS_PER_DEGREE_LONGITUDE: f64 = 111_320.0;

/// Converts an SVY21 easting/northing pair into WGS84 `(latitude, longitude)`.
///
/// Pure and total over finite inputs. Coordinates far outside Singapore
/// still produce a result; it is up to the caller to reject values that fall
/// outside the valid latitude/longitude ranges.
pub fn svy21_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let latitude = ORIGIN_LATITUDE + (y - FALSE_NORTHING) / METERS_PER_DEGREE_LATITUDE;

    let longitude_scale = METERS_PER_DEGREE_LONGITUDE * ORIGIN_LATITUDE.to_radians().cos();
    let longitude = ORIGIN_LONGITUDE + (x - FALSE_EASTING) / longitude_scale;

    (latitude, longitude)
}

/// Inverse of `svy21_to_wgs84`: WGS84 `(latitude, longitude)` to SVY21
/// `(x, y)` under the same linear approximation.
pub fn wgs84_to_svy21(latitude: f64, longitude: f64) -> (f64, f64) {
    let longitude_scale = METERS_PER_DEGREE_LONGITUDE * ORIGIN_LATITUDE.to_radians().cos();
    let x = FALSE_EASTING + (longitude - ORIGIN_LONGITUDE) * longitude_scale;
    let y = FALSE_NORTHING + (latitude - ORIGIN_LATITUDE) * METERS_PER_DEGREE_LATITUDE;
    (x, y)
}
