//! cellmap service - HTTP microservice for cellular coverage predictions.
//!
//! Loads one drive-test survey at startup and serves predictions, grades and
//! coverage surfaces over it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CELLMAP_MEASUREMENTS` | Survey CSV to load | None (empty survey) |
//! | `CELLMAP_PORT` | HTTP server port | 8080 |
//! | `CELLMAP_SURFACE_TIMEOUT_SECS` | Deadline for `/surface` scans | 30 |
//! | `CELLMAP_METRIC` | `auto`, `RSRP` or `RSSI` | auto |
//! | `CELLMAP_GRID_STEP_DEG` | Grid cell size in degrees | 0.0005 |
//! | `CELLMAP_IDW_NEIGHBORS` | Neighbours per prediction | 12 |
//! | `CELLMAP_IDW_POWER` | Inverse distance power | 2.0 |
//! | `CELLMAP_TILE_ALPHA` | Tile opacity (0-255) | 160 |
//! | `CELLMAP_IDENTITY_WEIGHTING` | Serving-cell aware weighting | true |
//! | `CELLMAP_SAME_CELL_BOOST` | Same-cell weight factor | 2.0 |
//! | `CELLMAP_MISMATCH_PENALTY` | Other-cell weight factor | 0.6 |
//! | `CELLMAP_MARGIN_DEG` | Grid margin in degrees | 0.002 |
//! | `CELLMAP_MAX_GRID_CELLS` | Largest grid allowed | 4000000 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /predict?lat=X&lon=Y` - Predict the signal at a coordinate
//! - `POST /predict` - Predict along a GeoJSON geometry
//! - `GET /grade?metric=RSRP&value=-97` - Grade a value
//! - `GET /surface` - Coverage surface as GeoJSON tiles (optional `bbox`)
//! - `GET /samples` - Survey samples as graded markers
//! - `GET /health` - Health check
//! - `GET /stats` - Survey and configuration summary
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cellmap::ingest::{read_measurements, IngestOptions};
use cellmap::{MapConfigBuilder, SampleStore};
use cellmap_service::{router, AppState, DEFAULT_SURFACE_TIMEOUT};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cellmap_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Service-specific settings
    let port: u16 = std::env::var("CELLMAP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let surface_timeout = std::env::var("CELLMAP_SURFACE_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(DEFAULT_SURFACE_TIMEOUT);

    // Interpolation settings come from the library's CELLMAP_* variables
    let config = MapConfigBuilder::from_env()?.build()?;

    let store = match std::env::var("CELLMAP_MEASUREMENTS") {
        Ok(path) => {
            let options = IngestOptions {
                metric: config.metric_preference,
                ..Default::default()
            };
            let ingested = read_measurements(&path, &options)?;
            tracing::info!(
                path = %path,
                rows = ingested.stats.rows,
                kept = ingested.stats.kept,
                skipped = ingested.stats.skipped(),
                "Loaded survey"
            );
            ingested.store()
        }
        Err(_) => {
            tracing::warn!("CELLMAP_MEASUREMENTS not set, serving an empty survey");
            SampleStore::default()
        }
    };

    tracing::info!(
        samples = store.len(),
        metric = %config.metric_preference,
        grid_step_deg = config.grid_step_deg,
        neighbors = config.neighbor_count,
        power = config.idw_power,
        identity_weighting = config.identity_weighting,
        surface_timeout_secs = surface_timeout.as_secs_f64(),
        port = port,
        "Starting cellmap service"
    );

    let state = Arc::new(AppState::new(store, config).with_surface_timeout(surface_timeout));

    let app = router(state).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
