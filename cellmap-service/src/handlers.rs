//! HTTP request handlers for the coverage service.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cellmap::geojson::{predict_along_geometry, samples_to_collection, tile_to_feature};
use cellmap::{
    continuous_color, try_predict, BoundingBox, CellmapError, IdwParams, MapConfig, MetricKind,
    SignalGrade, Surface,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Query parameters for the point prediction endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PredictQuery {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Neighbours considered (defaults to the service configuration).
    pub neighbors: Option<usize>,
    /// Inverse distance power (defaults to the service configuration).
    pub power: Option<f64>,
}

/// Point prediction. Fields are null when no prediction exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictResponse {
    /// Latitude queried.
    pub lat: f64,
    /// Longitude queried.
    pub lon: f64,
    /// Predicted value in dBm.
    pub signal: Option<f64>,
    /// Metric of the prediction (`RSRP` or `RSSI`).
    pub metric: Option<String>,
    /// Grade label of the prediction.
    pub grade: Option<String>,
    /// Why there is no prediction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Query parameters for the grading endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GradeQuery {
    /// `RSRP` or `RSSI`.
    pub metric: String,
    /// Value in dBm.
    pub value: f64,
    /// Ramp color opacity (defaults to the service tile alpha).
    pub alpha: Option<u8>,
}

/// Grade and colors of a value.
#[derive(Debug, Serialize, ToSchema)]
pub struct GradeResponse {
    pub metric: String,
    pub value: f64,
    /// Grade label, worst is `very poor`.
    pub grade: String,
    /// Marker style id.
    pub style: String,
    /// Legend marker color, `#rrggbb`.
    pub marker_color: String,
    /// Continuous ramp color, `#rrggbb`.
    pub ramp_color: String,
    /// Ramp color opacity in `[0, 1]`.
    pub ramp_opacity: f64,
}

/// Query parameters for the surface endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SurfaceQuery {
    /// Grid cell size in degrees.
    pub grid_step_deg: Option<f64>,
    /// Tile opacity (0-255).
    pub tile_alpha: Option<u8>,
    /// Neighbours considered per prediction.
    pub neighbors: Option<usize>,
    /// Inverse distance power.
    pub power: Option<f64>,
    /// Area to scan as `min_lat,min_lon,max_lat,max_lon` (defaults to the
    /// survey extent plus margin).
    pub bbox: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Survey and configuration summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Samples loaded.
    pub samples: usize,
    pub rsrp_samples: usize,
    pub rssi_samples: usize,
    /// `[min_lat, min_lon, max_lat, max_lon]` of the samples.
    pub bounds: Option<Vec<f64>>,
    pub grid_step_deg: f64,
    pub neighbors: usize,
    pub power: f64,
    pub identity_weighting: bool,
    pub surface_timeout_secs: f64,
}

/// Map a library error onto an HTTP status and JSON body.
pub fn error_response(e: &CellmapError) -> Response {
    let status = match e {
        CellmapError::InvalidConfig { .. }
        | CellmapError::UnknownMetric { .. }
        | CellmapError::InvalidCoordinate { .. }
        | CellmapError::GridTooLarge { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::warn!(status = status.as_u16(), error = %e, "Request failed");

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Parse `min_lat,min_lon,max_lat,max_lon`.
fn parse_bbox(raw: &str) -> Result<BoundingBox, CellmapError> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()
        .filter(|v| v.len() == 4)
        .ok_or_else(|| CellmapError::InvalidCoordinate {
            message: format!("bbox must be min_lat,min_lon,max_lat,max_lon (got {:?})", raw),
        })?;
    Ok(BoundingBox::new(values[0], values[1], values[2], values[3]))
}

fn request_params(
    config: &MapConfig,
    neighbors: Option<usize>,
    power: Option<f64>,
) -> Result<IdwParams, CellmapError> {
    let mut params = config.idw_params();
    if let Some(k) = neighbors {
        params.neighbors = k;
    }
    if let Some(p) = power {
        params.power = p;
    }
    params.validate()?;
    Ok(params)
}

/// Predict the signal at a coordinate.
#[utoipa::path(
    get,
    path = "/predict",
    params(PredictQuery),
    responses(
        (status = 200, description = "Prediction, or nulls with a reason", body = PredictResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    ),
    tag = "coverage"
)]
pub async fn get_predict(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
) -> Response {
    tracing::debug!(lat = query.lat, lon = query.lon, "Prediction query");

    let params = match request_params(&state.config, query.neighbors, query.power) {
        Ok(params) => params,
        Err(e) => return error_response(&e),
    };

    let response = match try_predict(&state.store, query.lat, query.lon, &params) {
        Ok(p) => PredictResponse {
            lat: query.lat,
            lon: query.lon,
            signal: Some(p.value),
            metric: Some(p.metric.as_str().to_string()),
            grade: Some(SignalGrade::from_value(p.metric, p.value).label().to_string()),
            reason: None,
        },
        Err(reason) => {
            tracing::debug!(lat = query.lat, lon = query.lon, %reason, "No prediction");
            PredictResponse {
                lat: query.lat,
                lon: query.lon,
                signal: None,
                metric: None,
                grade: None,
                reason: Some(reason.to_string()),
            }
        }
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Predict the signal at every position of a GeoJSON geometry.
///
/// The body is any GeoJSON geometry; the response is a FeatureCollection with
/// one Point per position.
#[utoipa::path(
    post,
    path = "/predict",
    request_body(content = String, content_type = "application/json", description = "GeoJSON geometry"),
    responses(
        (status = 200, description = "GeoJSON FeatureCollection of predictions"),
        (status = 400, description = "Invalid geometry", body = ErrorResponse)
    ),
    tag = "coverage"
)]
pub async fn post_predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let geometry: geojson::Geometry = match serde_json::from_slice(&body) {
        Ok(geometry) => geometry,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid GeoJSON body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid GeoJSON geometry: {}", e),
                }),
            )
                .into_response();
        }
    };

    match predict_along_geometry(&state.store, &geometry, &state.config.idw_params()) {
        Ok(collection) => {
            tracing::debug!(positions = collection.features.len(), "Geometry prediction");
            (StatusCode::OK, Json(collection)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Grade a value and return its legend and ramp colors.
#[utoipa::path(
    get,
    path = "/grade",
    params(GradeQuery),
    responses(
        (status = 200, description = "Grade and colors", body = GradeResponse),
        (status = 400, description = "Unknown metric", body = ErrorResponse)
    ),
    tag = "coverage"
)]
pub async fn get_grade(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GradeQuery>,
) -> Response {
    let metric: MetricKind = match query.metric.parse() {
        Ok(metric) => metric,
        Err(e) => return error_response(&e),
    };
    let grade = SignalGrade::from_value(metric, query.value);
    let ramp = continuous_color(
        metric,
        query.value,
        query.alpha.unwrap_or(state.config.tile_alpha),
    );

    Json(GradeResponse {
        metric: metric.as_str().to_string(),
        value: query.value,
        grade: grade.label().to_string(),
        style: grade.style_id().to_string(),
        marker_color: grade.marker_color().to_css_hex(),
        ramp_color: ramp.to_css_hex(),
        ramp_opacity: ramp.opacity(),
    })
    .into_response()
}

enum ScanError {
    Map(CellmapError),
    Cancelled,
}

/// Interpolated coverage surface as GeoJSON tiles.
///
/// The scan runs off the async runtime and is cancelled when it exceeds the
/// configured deadline.
#[utoipa::path(
    get,
    path = "/surface",
    params(SurfaceQuery),
    responses(
        (status = 200, description = "GeoJSON FeatureCollection of tiles"),
        (status = 400, description = "Invalid parameters or grid too large", body = ErrorResponse),
        (status = 504, description = "Scan exceeded the deadline", body = ErrorResponse)
    ),
    tag = "coverage"
)]
pub async fn get_surface(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SurfaceQuery>,
) -> Response {
    let mut config = state.config.clone();
    if let Some(step) = query.grid_step_deg {
        config.grid_step_deg = step;
    }
    if let Some(alpha) = query.tile_alpha {
        config.tile_alpha = alpha;
    }
    if let Some(k) = query.neighbors {
        config.neighbor_count = k;
    }
    if let Some(p) = query.power {
        config.idw_power = p;
    }
    let area = match query.bbox.as_deref().map(parse_bbox).transpose() {
        Ok(area) => area,
        Err(e) => return error_response(&e),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let scan = {
        let state = Arc::clone(&state);
        let cancel = Arc::clone(&cancel);
        tokio::task::spawn_blocking(move || {
            let surface = match area {
                Some(bounds) => Surface::within(&state.store, bounds, &config),
                None => Surface::new(&state.store, &config),
            }
            .map_err(ScanError::Map)?;
            let mut features = Vec::new();
            for row in 0..surface.rows() {
                if cancel.load(Ordering::Relaxed) {
                    return Err(ScanError::Cancelled);
                }
                features.extend(surface.row(row).map(|tile| tile_to_feature(&tile)));
            }
            Ok(geojson::FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            })
        })
    };

    match tokio::time::timeout(state.surface_timeout, scan).await {
        Ok(Ok(Ok(collection))) => {
            tracing::info!(tiles = collection.features.len(), "Surface generated");
            (StatusCode::OK, Json(collection)).into_response()
        }
        Ok(Ok(Err(ScanError::Map(e)))) => error_response(&e),
        Ok(Ok(Err(ScanError::Cancelled))) | Err(_) => {
            cancel.store(true, Ordering::Relaxed);
            tracing::warn!(
                timeout_secs = state.surface_timeout.as_secs_f64(),
                "Surface scan exceeded deadline"
            );
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(ErrorResponse {
                    error: format!(
                        "Surface generation exceeded {:.1}s; increase the grid step or the timeout",
                        state.surface_timeout.as_secs_f64()
                    ),
                }),
            )
                .into_response()
        }
        Ok(Err(join_error)) => {
            tracing::error!(error = %join_error, "Surface scan task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Surface scan failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Survey samples as graded GeoJSON markers.
#[utoipa::path(
    get,
    path = "/samples",
    responses((status = 200, description = "GeoJSON FeatureCollection of samples")),
    tag = "coverage"
)]
pub async fn get_samples(State(state): State<Arc<AppState>>) -> Response {
    Json(samples_to_collection(&state.store)).into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Survey and configuration summary.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Loaded survey statistics", body = StatsResponse)),
    tag = "system"
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let store = &state.store;
    let config = &state.config;

    Json(StatsResponse {
        samples: store.len(),
        rsrp_samples: store.count_metric(MetricKind::Rsrp),
        rssi_samples: store.count_metric(MetricKind::Rssi),
        bounds: store
            .bounds()
            .map(|b| vec![b.min_lat, b.min_lon, b.max_lat, b.max_lon]),
        grid_step_deg: config.grid_step_deg,
        neighbors: config.neighbor_count,
        power: config.idw_power,
        identity_weighting: config.identity_weighting,
        surface_timeout_secs: state.surface_timeout.as_secs_f64(),
    })
}
