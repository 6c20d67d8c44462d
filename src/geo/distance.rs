//! Great-circle distance.

/// Mean Earth radius used for all distance calculations, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two WGS84 points, in kilometres.
///
/// All finite inputs are valid, including the poles and pairs that straddle
/// the antimeridian. Identical points yield exactly `0.0`.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let c = 2.0 * a.min(1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} ± {}, got {}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn test_distance_to_self_is_exactly_zero() {
        let points = [
            (1.3, 103.8),
            (0.0, 0.0),
            (90.0, 0.0),
            (-90.0, 45.0),
            (12.5, 180.0),
            (-33.8688, 151.2093),
        ];
        for (lat, lon) in points {
            assert_eq!(haversine_km(lat, lon, lat, lon), 0.0, "point ({}, {})", lat, lon);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            ((1.3, 103.8), (1.31, 103.81)),
            ((51.5074, -0.1278), (40.7128, -74.0060)),
            ((-89.9, 10.0), (89.9, -170.0)),
            ((0.0, 179.5), (0.0, -179.5)),
        ];
        for ((lat1, lon1), (lat2, lon2)) in pairs {
            let ab = haversine_km(lat1, lon1, lat2, lon2);
            let ba = haversine_km(lat2, lon2, lat1, lon1);
            assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0), "{} vs {}", ab, ba);
        }
    }

    #[test]
    fn test_one_degree_of_latitude_is_about_111_km() {
        assert_close(haversine_km(0.0, 0.0, 1.0, 0.0), 111.195, 0.01);
    }

    #[test]
    fn test_london_to_new_york() {
        assert_close(haversine_km(51.5074, -0.1278, 40.7128, -74.0060), 5570.2, 1.0);
    }

    #[test]
    fn test_antimeridian_crossing_takes_the_short_way() {
        // 179.5E to 179.5W is one degree of longitude at the equator, not 359.
        assert_close(haversine_km(0.0, 179.5, 0.0, -179.5), 111.195, 0.01);
    }

    #[test]
    fn test_pole_to_pole_is_half_circumference() {
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert_close(haversine_km(90.0, 0.0, -90.0, 0.0), half, 1e-6);
    }

    #[test]
    fn test_distance_grows_with_separation() {
        let mut previous = 0.0;
        for step in 1..=10 {
            let d = haversine_km(1.3, 103.8, 1.3 + step as f64 * 0.01, 103.8);
            assert!(d > previous, "step {} gave {} after {}", step, d, previous);
            previous = d;
        }
    }
}
