//! Great-circle distances for proximity filtering.

use crate::config::EARTH_RADIUS_KM;

/// Haversine distance in kilometres between two `(lat, lng)` points in degrees.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        assert!(haversine_km(45.5, -122.6, 45.5, -122.6).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_symmetric() {
        let a = haversine_km(45.52, -122.68, 45.53, -122.66);
        let b = haversine_km(45.53, -122.66, 45.52, -122.68);
        assert!((a - b).abs() < 1e-12);
    }
}
