//! HTTP front end over a loaded [`RegionStore`].
//!
//! Routes:
//! - `GET /` service banner
//! - `GET /health` readiness and region count
//! - `GET /locate?lat=..&lng=..` point lookup
//!
//! Parameter parsing and the optional service-area rule live here; the store
//! only ever sees validated coordinates.

use crate::compute::validation::parse_query_point;
use crate::error::Error;
use crate::locator::PointLocator;
use crate::store::RegionStore;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use geotract_types::bbox::BoundingBox2D;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared, read-only state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<RegionStore>,
    service_area: Option<BoundingBox2D>,
}

impl AppState {
    pub fn new(store: Arc<RegionStore>) -> Self {
        Self {
            store,
            service_area: None,
        }
    }

    /// Reject lookups outside `area` before they reach the store.
    pub fn with_service_area(mut self, area: BoundingBox2D) -> Self {
        self.service_area = Some(area);
        self
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    /// False when a service area is set but shares no point with the loaded
    /// regions, so every lookup would either be rejected or miss.
    pub fn service_area_reaches_store(&self) -> bool {
        self.service_area
            .is_none_or(|area| area.intersects(self.store.extent()))
    }
}

#[derive(Debug, Deserialize)]
pub struct LocateParams {
    lat: Option<String>,
    lng: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LocateResponse {
    pub lat: f64,
    pub lng: f64,
    pub found: bool,
    pub region: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub ready: bool,
    pub regions: usize,
}

/// Error payload for rejected requests.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::InvalidConfig(_) | Error::Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/locate", get(locate))
        .with_state(state)
}

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Census tract locator is running",
        "status": "success",
        "version": crate::VERSION,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ready: state.store.is_ready(),
        regions: state.store.count(),
    })
}

async fn locate(
    State(state): State<AppState>,
    Query(params): Query<LocateParams>,
) -> Result<Json<LocateResponse>, ApiError> {
    let (Some(lat), Some(lng)) = (params.lat.as_deref(), params.lng.as_deref()) else {
        return Err(Error::InvalidInput(
            "both lat and lng query parameters are required".to_string(),
        )
        .into());
    };

    let point = parse_query_point(lng, lat)?;

    if let Some(area) = &state.service_area
        && !area.contains_point(&point)
    {
        return Err(Error::InvalidInput(format!(
            "coordinates ({}, {}) are outside the service area",
            point.y(),
            point.x()
        ))
        .into());
    }

    let location = PointLocator::locate(&state.store, &point);
    tracing::debug!(lat = point.y(), lng = point.x(), ?location, "located point");

    Ok(Json(LocateResponse {
        lat: point.y(),
        lng: point.x(),
        found: location.is_found(),
        region: location.into_option().map(|id| id.into_string()),
    }))
}

/// Serve `state` on `addr` until `shutdown` resolves.
pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Serving {} regions on http://{}",
        state.store.count(),
        listener.local_addr()?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
