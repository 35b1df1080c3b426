use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coverage::COVERAGE_RADIUS_KM;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub coverage: CoverageConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    /// Snapshots live at `{balloon_base_url}/{hh}.json`.
    pub balloon_base_url: String,
    pub places_url: String,
    pub hours: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CoverageConfig {
    pub radius_km: f64,
    pub spatial_index: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            balloon_base_url: "https://a.windbornesystems.com/treasure".to_string(),
            places_url: "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_populated_places_simple.geojson".to_string(),
            hours: 24,
        }
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self { radius_km: COVERAGE_RADIUS_KM, spatial_index: false }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000, static_dir: None }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Reads `path` when given, otherwise falls back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}
