use geo::Point;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers between two lon/lat points (x = lon, y = lat).
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] near antipodes.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::HaversineDistance;

    #[test]
    fn zero_for_identical_points() {
        for (lon, lat) in [(0.0, 0.0), (179.9, -89.0), (-45.5, 60.25)] {
            let p = Point::new(lon, lat);
            assert_eq!(haversine_km(p, p), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let a = Point::new(-0.1276, 51.5072);
        let b = Point::new(139.6917, 35.6895);
        assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    #[test]
    fn half_circumference_along_equator() {
        let d = haversine_km(Point::new(0.0, 0.0), Point::new(180.0, 0.0));
        assert!((d - 20015.0868).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn antipodal_through_poles_is_finite() {
        let d = haversine_km(Point::new(30.0, 45.0), Point::new(-150.0, -45.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn agrees_with_geo_within_radius_difference() {
        // geo uses a 6371.0088 km mean radius, so allow that relative slack.
        let a = Point::new(2.3522, 48.8566);
        let b = Point::new(-74.0060, 40.7128);
        let ours = haversine_km(a, b);
        let theirs = a.haversine_distance(&b) / 1000.0;
        assert!(((ours - theirs) / theirs).abs() < 1e-5);
    }
}
