use crate::config::AppConfig;
use crate::data::{self, Dataset, HourReport};
use crate::types::{hour_label, positions_at_hour, CoverageSummary, Place, Position};
use crate::wrap::{wrap_all, WrappedPoint, MAP_BOUNDS};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub dataset: RwLock<Dataset>,
    pub config: AppConfig,
    pub client: Client,
}

#[derive(Deserialize)]
pub struct HourQuery {
    hour: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResponse {
    hour: u32,
    label: String,
    summary: CoverageSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedResponse {
    hour: u32,
    bounds: [[f64; 2]; 2],
    balloons: Vec<WrappedPoint<Position>>,
    places: Vec<WrappedPoint<Place>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    positions: usize,
    places: usize,
    hours: Vec<HourReport>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/balloons", get(balloons_handler))
        .route("/api/places", get(places_handler))
        .route("/api/coverage", get(coverage_handler))
        .route("/api/hours", get(hours_handler))
        .route("/api/wrapped", get(wrapped_handler))
        .route("/api/refresh", post(refresh_handler));

    if let Some(dir) = &state.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn start_server(config: AppConfig, client: Client, dataset: Dataset) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState {
        dataset: RwLock::new(dataset),
        config,
        client,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn balloons_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HourQuery>,
) -> Json<Vec<Position>> {
    let dataset = state.dataset.read().await;
    match params.hour {
        Some(hour) => Json(positions_at_hour(&dataset.positions, hour)),
        None => Json(dataset.positions.clone()),
    }
}

async fn places_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Place>> {
    Json(state.dataset.read().await.places.clone())
}

async fn coverage_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HourQuery>,
) -> Json<CoverageResponse> {
    let hour = params.hour.unwrap_or(0);
    let summary = state.dataset.read().await.coverage(&state.config.coverage, hour);
    Json(CoverageResponse {
        hour,
        label: hour_label(hour),
        summary,
    })
}

async fn hours_handler(State(state): State<Arc<AppState>>) -> Json<Vec<HourReport>> {
    Json(state.dataset.read().await.reports())
}

async fn wrapped_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HourQuery>,
) -> Json<WrappedResponse> {
    let hour = params.hour.unwrap_or(0);
    let dataset = state.dataset.read().await;
    Json(WrappedResponse {
        hour,
        bounds: MAP_BOUNDS,
        balloons: wrap_all(&positions_at_hour(&dataset.positions, hour)),
        places: wrap_all(&dataset.places),
    })
}

async fn refresh_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<RefreshResponse>) {
    // Load outside the lock so readers keep the previous dataset meanwhile.
    let fresh = data::load_data_with(&state.client, &state.config).await;
    let response = RefreshResponse {
        positions: fresh.positions.len(),
        places: fresh.places.len(),
        hours: fresh.reports(),
    };
    *state.dataset.write().await = fresh;
    (StatusCode::OK, Json(response))
}
