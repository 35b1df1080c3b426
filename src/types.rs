use geo::Point;
use serde::Serialize;

/// Anything with a latitude/longitude that can be placed on the map.
pub trait Located {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;

    fn point(&self) -> Point<f64> {
        Point::new(self.longitude(), self.latitude())
    }
}

/// One balloon observation at a given hour offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    // Raw from the feed, not normalized.
    pub longitude: f64,
    pub altitude_km: f64,
    pub hours_ago: u32,
}

/// One population center.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    pub country: String,
    pub population_estimate: u64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub total_positions: usize,
    pub positions_covered: usize,
    /// Rounded to one decimal.
    pub coverage_percentage: f64,
    pub cities_covered: usize,
    pub population_covered_millions: u64,
}

impl Located for Position {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Located for Place {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Positions observed `hour` hours before the most recent snapshot.
pub fn positions_at_hour(positions: &[Position], hour: u32) -> Vec<Position> {
    positions
        .iter()
        .filter(|p| p.hours_ago == hour)
        .cloned()
        .collect()
}

pub fn hour_label(hour: u32) -> String {
    match hour {
        0 => "Current Position".to_string(),
        1 => "1 hour ago".to_string(),
        h => format!("{} hours ago", h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(hour: u32) -> Position {
        Position { latitude: 1.0, longitude: 2.0, altitude_km: 15.0, hours_ago: hour }
    }

    #[test]
    fn filters_by_hour() {
        let all = vec![pos(0), pos(1), pos(0), pos(5)];
        assert_eq!(positions_at_hour(&all, 0).len(), 2);
        assert_eq!(positions_at_hour(&all, 5).len(), 1);
        assert!(positions_at_hour(&all, 3).is_empty());
    }

    #[test]
    fn labels() {
        assert_eq!(hour_label(0), "Current Position");
        assert_eq!(hour_label(1), "1 hour ago");
        assert_eq!(hour_label(12), "12 hours ago");
    }

    #[test]
    fn point_uses_lon_as_x() {
        let p = pos(0).point();
        assert_eq!(p.x(), 2.0);
        assert_eq!(p.y(), 1.0);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(pos(3)).unwrap();
        assert_eq!(json["hoursAgo"], 3);
        assert_eq!(json["altitudeKm"], 15.0);
    }
}
