use crate::config::{AppConfig, CoverageConfig};
use crate::coverage;
use crate::types::{hour_label, positions_at_hour, CoverageSummary, Place, Position};
use anyhow::{Context, Result};
use futures::future::join_all;
use geojson::GeoJson;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Result of one hourly snapshot request. A failed hour contributes no
/// positions but stays distinguishable from an hour with zero balloons.
#[derive(Debug)]
pub enum HourOutcome {
    Fetched(Vec<Position>),
    Failed(FetchError),
}

#[derive(Debug)]
pub struct HourFetch {
    pub hour: u32,
    pub outcome: HourOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourReport {
    pub hour: u32,
    pub label: String,
    pub ok: bool,
    pub count: usize,
    pub error: Option<String>,
}

impl HourFetch {
    pub fn positions(&self) -> &[Position] {
        match &self.outcome {
            HourOutcome::Fetched(positions) => positions,
            HourOutcome::Failed(_) => &[],
        }
    }

    pub fn report(&self) -> HourReport {
        let error = match &self.outcome {
            HourOutcome::Fetched(_) => None,
            HourOutcome::Failed(e) => Some(e.to_string()),
        };
        HourReport {
            hour: self.hour,
            label: hour_label(self.hour),
            ok: error.is_none(),
            count: self.positions().len(),
            error,
        }
    }
}

/// Everything one page load needs: per-hour outcomes, the flattened
/// positions in hour order, and the place collection.
#[derive(Debug, Default)]
pub struct Dataset {
    pub hours: Vec<HourFetch>,
    pub positions: Vec<Position>,
    pub places: Vec<Place>,
}

impl Dataset {
    pub fn new(hours: Vec<HourFetch>, places: Vec<Place>) -> Self {
        let positions = hours.iter().flat_map(|h| h.positions().iter().cloned()).collect();
        Self { hours, positions, places }
    }

    pub fn reports(&self) -> Vec<HourReport> {
        self.hours.iter().map(HourFetch::report).collect()
    }

    pub fn coverage(&self, config: &CoverageConfig, hour: u32) -> CoverageSummary {
        let current = positions_at_hour(&self.positions, hour);
        coverage::summarize(config, &current, &self.places)
    }
}

pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub async fn load_data(config: &AppConfig) -> Result<Dataset> {
    let client = http_client()?;
    Ok(load_data_with(&client, config).await)
}

/// Issues every hourly request and the places request at once and waits for
/// all of them to settle. Never fails; missing sources come back empty.
pub async fn load_data_with(client: &Client, config: &AppConfig) -> Dataset {
    info!(hours = config.sources.hours, "Loading balloon snapshots and populated places");

    let (hours, places) = tokio::join!(
        fetch_all_balloons(client, &config.sources.balloon_base_url, config.sources.hours),
        fetch_places(client, &config.sources.places_url),
    );

    let dataset = Dataset::new(hours, places);
    let failed = dataset.hours.iter().filter(|h| matches!(h.outcome, HourOutcome::Failed(_))).count();
    info!(
        positions = dataset.positions.len(),
        places = dataset.places.len(),
        failed_hours = failed,
        "Load complete"
    );
    dataset
}

pub fn snapshot_url(base_url: &str, hour: u32) -> String {
    format!("{}/{:02}.json", base_url.trim_end_matches('/'), hour)
}

pub async fn fetch_all_balloons(client: &Client, base_url: &str, hours: u32) -> Vec<HourFetch> {
    // join_all keeps input order, so results come back sorted by hour.
    join_all((0..hours).map(|hour| fetch_balloon_hour(client, base_url, hour))).await
}

pub async fn fetch_balloon_hour(client: &Client, base_url: &str, hour: u32) -> HourFetch {
    let url = snapshot_url(base_url, hour);
    let result = match get_text(client, &url).await {
        Ok(body) => parse_snapshot(&body, hour),
        Err(e) => Err(e),
    };

    let outcome = match result {
        Ok(positions) => {
            debug!(hour, count = positions.len(), "Fetched balloon snapshot");
            HourOutcome::Fetched(positions)
        }
        Err(e) => {
            warn!(hour, error = %e, "Balloon snapshot unavailable");
            HourOutcome::Failed(e)
        }
    };

    HourFetch { hour, outcome }
}

/// Places from the population feature collection, or nothing on any failure.
pub async fn fetch_places(client: &Client, url: &str) -> Vec<Place> {
    let result = match get_text(client, url).await {
        Ok(body) => parse_places(&body),
        Err(e) => Err(e),
    };

    match result {
        Ok(places) => {
            info!(count = places.len(), "Loaded populated places");
            places
        }
        Err(e) => {
            warn!(error = %e, "Populated places unavailable");
            Vec::new()
        }
    }
}

async fn get_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}

/// Decodes a `[[lat, lon, alt], ...]` snapshot. A payload that is not a JSON
/// array fails the hour; individual tuples that are not three numbers are
/// skipped.
pub fn parse_snapshot(body: &str, hour: u32) -> Result<Vec<Position>, FetchError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let entries = payload
        .as_array()
        .ok_or_else(|| FetchError::Malformed("snapshot is not a JSON array".to_string()))?;

    let positions: Vec<Position> = entries
        .iter()
        .filter_map(|entry| {
            let tuple = entry.as_array()?;
            let latitude = tuple.first()?.as_f64()?;
            let longitude = tuple.get(1)?.as_f64()?;
            let altitude_km = tuple.get(2)?.as_f64()?;
            Some(Position { latitude, longitude, altitude_km, hours_ago: hour })
        })
        .collect();

    let skipped = entries.len() - positions.len();
    if skipped > 0 {
        debug!(hour, skipped, "Skipped malformed balloon tuples");
    }

    Ok(positions)
}

/// Maps a GeoJSON feature collection of points into places. Coordinates are
/// stored `[lon, lat]` on the wire. Features without a point geometry are
/// skipped.
pub fn parse_places(body: &str) -> Result<Vec<Place>, FetchError> {
    let geojson: GeoJson = body.parse().map_err(|e: geojson::Error| FetchError::Malformed(e.to_string()))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(FetchError::Malformed("expected a FeatureCollection".to_string())),
    };

    let places = collection
        .features
        .iter()
        .filter_map(|feature| {
            let coords = match &feature.geometry.as_ref()?.value {
                geojson::Value::Point(coords) if coords.len() >= 2 => coords,
                _ => return None,
            };
            Some(Place {
                name: string_property(feature, "name"),
                country: string_property(feature, "adm0name"),
                population_estimate: population(feature),
                latitude: coords[1],
                longitude: coords[0],
            })
        })
        .collect();

    Ok(places)
}

fn string_property(feature: &geojson::Feature, key: &str) -> String {
    feature
        .property(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `pop_max`, else `pop_min`, else zero. Zero, negative and non-numeric
/// values count as absent.
fn population(feature: &geojson::Feature) -> u64 {
    ["pop_max", "pop_min"]
        .iter()
        .filter_map(|key| feature.property(key).and_then(Value::as_f64))
        .find(|pop| *pop > 0.0)
        .map(|pop| pop.round() as u64)
        .unwrap_or(0)
}
