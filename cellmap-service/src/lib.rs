//! cellmap service library
//!
//! HTTP handlers, routing and OpenAPI documentation for the coverage
//! service. Used by both the `cellmap-service` binary and integration tests.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use cellmap::{MapConfig, SampleStore};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Default deadline for a surface scan.
pub const DEFAULT_SURFACE_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across handlers.
pub struct AppState {
    /// Loaded survey samples.
    pub store: SampleStore,
    /// Interpolation and grid defaults.
    pub config: MapConfig,
    /// Deadline for `/surface` scans.
    pub surface_timeout: Duration,
}

impl AppState {
    pub fn new(store: SampleStore, config: MapConfig) -> Self {
        Self {
            store,
            config,
            surface_timeout: DEFAULT_SURFACE_TIMEOUT,
        }
    }

    pub fn with_surface_timeout(mut self, timeout: Duration) -> Self {
        self.surface_timeout = timeout;
        self
    }
}

/// OpenAPI documentation for the coverage service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "cellmap Coverage Service",
        version = "0.1.0",
        description = "REST API for cellular signal predictions and coverage surfaces from a drive-test survey.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_predict,
        handlers::post_predict,
        handlers::get_grade,
        handlers::get_surface,
        handlers::get_samples,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::PredictResponse,
            handlers::GradeResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "coverage", description = "Prediction and coverage endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router with Swagger UI at `/docs`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/predict",
            get(handlers::get_predict).post(handlers::post_predict),
        )
        .route("/grade", get(handlers::get_grade))
        .route("/surface", get(handlers::get_surface))
        .route("/samples", get(handlers::get_samples))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{
    ErrorResponse, GradeResponse, HealthResponse, PredictResponse, StatsResponse,
};
