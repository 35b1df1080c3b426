use crate::config::CoverageConfig;
use crate::geodesy::{haversine_km, EARTH_RADIUS_KM};
use crate::types::{CoverageSummary, Located, Place, Position};
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::HashMap;

pub const COVERAGE_RADIUS_KM: f64 = 500.0;

/// Computes coverage for one hour's positions, choosing the sweep from config.
pub fn summarize(config: &CoverageConfig, positions: &[Position], places: &[Place]) -> CoverageSummary {
    if config.spatial_index {
        CoverageIndex::new(places, config.radius_km).summarize(positions)
    } else {
        pairwise_coverage(positions, places, config.radius_km)
    }
}

/// Full O(positions x places) sweep.
pub fn pairwise_coverage(positions: &[Position], places: &[Place], radius_km: f64) -> CoverageSummary {
    let mut tally = Tally::new(positions.len());

    for position in positions {
        let mut covered = false;
        for place in places {
            if haversine_km(position.point(), place.point()) <= radius_km {
                covered = true;
                tally.add_place(place);
            }
        }
        if covered {
            tally.positions_covered += 1;
        }
    }

    tally.finish()
}

type IndexedPlace = GeomWithData<[f64; 3], usize>;

/// R-tree over places embedded on the unit sphere, so range queries have no
/// antimeridian or pole special cases. Candidates are confirmed with the
/// haversine distance, which keeps results identical to [`pairwise_coverage`].
pub struct CoverageIndex<'a> {
    places: &'a [Place],
    tree: RTree<IndexedPlace>,
    radius_km: f64,
    chord_sq: f64,
}

impl<'a> CoverageIndex<'a> {
    pub fn new(places: &'a [Place], radius_km: f64) -> Self {
        let items: Vec<IndexedPlace> = places
            .iter()
            .enumerate()
            .map(|(i, place)| GeomWithData::new(unit_vector(place), i))
            .collect();

        let angle = (radius_km.max(0.0) / EARTH_RADIUS_KM).min(std::f64::consts::PI);
        let chord = 2.0 * (angle / 2.0).sin();
        // Slack for the embedding round trip; exact test is haversine below.
        let chord = chord * (1.0 + 1e-9) + 1e-12;

        Self {
            places,
            tree: RTree::bulk_load(items),
            radius_km,
            chord_sq: chord * chord,
        }
    }

    /// Places within the coverage radius of `position`, by index.
    pub fn covering(&self, position: &Position) -> Vec<usize> {
        let query = unit_vector(position);
        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance(query, self.chord_sq)
            .map(|item| item.data)
            .filter(|&i| haversine_km(position.point(), self.places[i].point()) <= self.radius_km)
            .collect();
        hits.sort_unstable();
        hits
    }

    pub fn summarize(&self, positions: &[Position]) -> CoverageSummary {
        let hits: Vec<Vec<usize>> = positions.par_iter().map(|p| self.covering(p)).collect();

        let mut tally = Tally::new(positions.len());
        for covering in hits {
            if covering.is_empty() {
                continue;
            }
            tally.positions_covered += 1;
            for i in covering {
                tally.add_place(&self.places[i]);
            }
        }
        tally.finish()
    }
}

fn unit_vector<L: Located>(item: &L) -> [f64; 3] {
    let lat = item.latitude().to_radians();
    let lon = item.longitude().to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

struct Tally<'p> {
    total_positions: usize,
    positions_covered: usize,
    // Keyed by place name; each covered city contributes its population once.
    cities: HashMap<&'p str, u64>,
}

impl<'p> Tally<'p> {
    fn new(total_positions: usize) -> Self {
        Self { total_positions, positions_covered: 0, cities: HashMap::new() }
    }

    fn add_place(&mut self, place: &'p Place) {
        let entry = self.cities.entry(place.name.as_str()).or_insert(0);
        // Same-name collisions keep the larger estimate, independent of visit order.
        *entry = (*entry).max(place.population_estimate);
    }

    fn finish(self) -> CoverageSummary {
        let coverage_percentage = if self.total_positions == 0 {
            0.0
        } else {
            let pct = self.positions_covered as f64 / self.total_positions as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        };
        let population: u64 = self.cities.values().sum();

        CoverageSummary {
            total_positions: self.total_positions,
            positions_covered: self.positions_covered,
            coverage_percentage,
            cities_covered: self.cities.len(),
            population_covered_millions: (population as f64 / 1_000_000.0).round() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balloon(lat: f64, lon: f64) -> Position {
        Position { latitude: lat, longitude: lon, altitude_km: 18.0, hours_ago: 0 }
    }

    fn city(name: &str, lat: f64, lon: f64, pop: u64) -> Place {
        Place {
            name: name.to_string(),
            country: "Testland".to_string(),
            population_estimate: pop,
            latitude: lat,
            longitude: lon,
        }
    }

    fn both(positions: &[Position], places: &[Place]) -> CoverageSummary {
        let pairwise = pairwise_coverage(positions, places, COVERAGE_RADIUS_KM);
        let indexed = CoverageIndex::new(places, COVERAGE_RADIUS_KM).summarize(positions);
        assert_eq!(pairwise, indexed);
        pairwise
    }

    #[test]
    fn empty_positions_give_zero_summary() {
        let places = vec![city("A", 0.0, 0.0, 1_000_000)];
        let s = both(&[], &places);
        assert_eq!(s.total_positions, 0);
        assert_eq!(s.coverage_percentage, 0.0);
        assert_eq!(s.cities_covered, 0);
        assert_eq!(s.population_covered_millions, 0);
    }

    #[test]
    fn empty_places_keep_total() {
        let s = both(&[balloon(0.0, 0.0), balloon(10.0, 10.0)], &[]);
        assert_eq!(s.total_positions, 2);
        assert_eq!(s.positions_covered, 0);
        assert_eq!(s.coverage_percentage, 0.0);
        assert_eq!(s.cities_covered, 0);
        assert_eq!(s.population_covered_millions, 0);
    }

    #[test]
    fn single_overhead_balloon() {
        let s = both(&[balloon(0.0, 0.0)], &[city("Origin", 0.0, 0.0, 2_000_000)]);
        assert_eq!(s.positions_covered, 1);
        assert_eq!(s.cities_covered, 1);
        assert_eq!(s.population_covered_millions, 2);
        assert_eq!(s.coverage_percentage, 100.0);
    }

    #[test]
    fn city_counted_once_for_many_balloons() {
        let positions = vec![balloon(0.0, 0.0), balloon(1.0, 1.0), balloon(-1.0, 0.5)];
        let s = both(&positions, &[city("Hub", 0.0, 0.0, 3_000_000)]);
        assert_eq!(s.positions_covered, 3);
        assert_eq!(s.cities_covered, 1);
        assert_eq!(s.population_covered_millions, 3);
    }

    #[test]
    fn balloon_counted_once_for_many_cities() {
        let places = vec![city("East", 0.0, 1.0, 1_000_000), city("West", 0.0, -1.0, 1_400_000)];
        let s = both(&[balloon(0.0, 0.0), balloon(60.0, 60.0)], &places);
        assert_eq!(s.total_positions, 2);
        assert_eq!(s.positions_covered, 1);
        assert_eq!(s.coverage_percentage, 50.0);
        assert_eq!(s.cities_covered, 2);
        assert_eq!(s.population_covered_millions, 2);
    }

    #[test]
    fn radius_is_inclusive_and_bounded() {
        // One degree of arc is R * pi / 180, about 111.19 km.
        let km_per_deg = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        let inside = 499.0 / km_per_deg;
        let outside = 501.0 / km_per_deg;
        let places = vec![city("Near", 0.0, inside, 1_000_000), city("Far", 0.0, -outside, 5_000_000)];
        let s = both(&[balloon(0.0, 0.0)], &places);
        assert_eq!(s.cities_covered, 1);
        assert_eq!(s.population_covered_millions, 1);
    }

    #[test]
    fn coverage_across_the_antimeridian() {
        let s = both(&[balloon(10.0, 179.5)], &[city("Dateline", 10.0, -179.5, 900_000)]);
        assert_eq!(s.positions_covered, 1);
        assert_eq!(s.population_covered_millions, 1);
    }

    #[test]
    fn raw_unnormalized_longitude_still_matches() {
        let s = both(&[balloon(0.0, 360.0)], &[city("Origin", 0.0, 0.0, 1_000_000)]);
        assert_eq!(s.positions_covered, 1);
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        let positions = vec![balloon(0.0, 0.0), balloon(50.0, 50.0), balloon(-50.0, -50.0)];
        let s = both(&positions, &[city("Origin", 0.0, 0.0, 0)]);
        assert_eq!(s.coverage_percentage, 33.3);
    }

    #[test]
    fn summarize_follows_config() {
        let places = vec![city("Origin", 0.0, 0.0, 2_400_000)];
        let positions = vec![balloon(0.0, 0.0)];
        let plain = CoverageConfig { radius_km: 500.0, spatial_index: false };
        let indexed = CoverageConfig { radius_km: 500.0, spatial_index: true };
        assert_eq!(summarize(&plain, &positions, &places), summarize(&indexed, &positions, &places));
    }
}
