//! # cellmap - Cellular Coverage Maps
//!
//! Turns a drive-test survey (geolocated RSRP/RSSI measurements) into a
//! continuous, color-graded coverage surface using identity-aware inverse
//! distance weighting.
//!
//! ## Features
//!
//! - **Identity-aware IDW**: neighbours served by the same cell as the nearest
//!   sample weigh more than those that are not
//! - **Honest gaps**: no prediction near nothing, snapping onto samples
//!   within a few meters
//! - **Lazy surfaces**: grid tiles are produced on demand, in a deterministic
//!   row-major order
//! - **Optional extras**: survey CSV ingestion (`csv`), GeoJSON rendering
//!   (`geojson`) and a parallel grid scan (`parallel`)
//!
//! ## Quick Start
//!
//! ```
//! use cellmap::{build_surface, predict, IdwParams, MapConfig, MetricKind, Sample, SampleStore};
//!
//! let store = SampleStore::new(vec![
//!     Sample::new(32.1000, 35.1900, -88.0, MetricKind::Rsrp).with_cell_id(1001),
//!     Sample::new(32.1010, 35.1912, -101.0, MetricKind::Rsrp).with_cell_id(1001),
//!     Sample::new(32.1021, 35.1893, -117.0, MetricKind::Rsrp).with_cell_id(2002),
//! ]);
//!
//! let p = predict(&store, 32.1005, 35.1905, &IdwParams::default()).unwrap();
//! assert_eq!(p.metric, MetricKind::Rsrp);
//!
//! let tiles: Vec<_> = build_surface(&store, &MapConfig::default()).unwrap().collect();
//! assert!(!tiles.is_empty());
//! ```
//!
//! ## Signal Grades
//!
//! | Grade | RSRP (dBm) | RSSI (dBm) |
//! |-------|-----------|------------|
//! | very poor | <= -115 | <= -110 |
//! | poor | <= -105 | <= -100 |
//! | fair | <= -95 | <= -90 |
//! | good | <= -90 | <= -80 |
//! | very good | <= -85 | <= -70 |
//! | excellent | above | above |

pub mod config;
pub mod error;
pub mod geo;
pub mod grade;
pub mod interpolate;
pub mod sample;
pub mod surface;

#[cfg(feature = "csv")]
pub mod ingest;

#[cfg(feature = "geojson")]
pub mod geojson;

// Re-export main types at crate root for convenience
pub use config::{MapConfig, MapConfigBuilder};
pub use error::{CellmapError, Result};
pub use geo::{distance_meters, BoundingBox};
pub use grade::{continuous_color, grade, Rgba, SignalGrade};
pub use interpolate::{predict, try_predict, IdwParams, IdentityWeighting, NoPrediction, Prediction};
pub use sample::{CellIdentity, MetricKind, MetricPreference, Sample, SampleStore};
pub use surface::{build_surface, GridSpec, Surface, Tile, Tiles};
