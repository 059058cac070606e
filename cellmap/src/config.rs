//! Coverage map configuration.
//!
//! [`MapConfig`] collects every tunable of a map-generation run. Build it with
//! [`MapConfigBuilder`], either from explicit values or from `CELLMAP_*`
//! environment variables; `build()` validates the result so that a bad option
//! fails before any scan begins.

use crate::error::{CellmapError, Result};
use crate::interpolate::{
    IdentityWeighting, IdwParams, DEFAULT_MISMATCH_PENALTY, DEFAULT_NEIGHBORS, DEFAULT_POWER,
    DEFAULT_SAME_CELL_BOOST,
};
use crate::sample::MetricPreference;

/// Default grid step in degrees (~55 m of latitude).
pub const DEFAULT_GRID_STEP_DEG: f64 = 0.0005;

/// Default tile alpha.
pub const DEFAULT_TILE_ALPHA: u8 = 160;

/// Default margin added around the samples' bounding box, in degrees (~220 m).
pub const DEFAULT_MARGIN_DEG: f64 = 0.002;

/// Default upper bound on the number of grid cells in one scan.
pub const DEFAULT_MAX_GRID_CELLS: u64 = 4_000_000;

/// Options for one coverage-map run.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Metric selection policy applied at ingestion.
    pub metric_preference: MetricPreference,
    /// Grid step in degrees, for both latitude and longitude.
    pub grid_step_deg: f64,
    /// Neighbors blended per prediction.
    pub neighbor_count: usize,
    /// Inverse-distance exponent.
    pub idw_power: f64,
    /// Alpha channel of surface tiles.
    pub tile_alpha: u8,
    /// Whether serving-cell identity adjusts neighbor weights.
    pub identity_weighting: bool,
    /// Weight multiplier for neighbors on the nearest sample's cell.
    pub same_cell_boost: f64,
    /// Weight multiplier for neighbors on other cells.
    pub mismatch_penalty: f64,
    /// Margin around the samples' bounding box, in degrees.
    pub margin_deg: f64,
    /// Largest grid a scan may cover.
    pub max_grid_cells: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            metric_preference: MetricPreference::Auto,
            grid_step_deg: DEFAULT_GRID_STEP_DEG,
            neighbor_count: DEFAULT_NEIGHBORS,
            idw_power: DEFAULT_POWER,
            tile_alpha: DEFAULT_TILE_ALPHA,
            identity_weighting: true,
            same_cell_boost: DEFAULT_SAME_CELL_BOOST,
            mismatch_penalty: DEFAULT_MISMATCH_PENALTY,
            margin_deg: DEFAULT_MARGIN_DEG,
            max_grid_cells: DEFAULT_MAX_GRID_CELLS,
        }
    }
}

impl MapConfig {
    /// Create a builder starting from the defaults.
    pub fn builder() -> MapConfigBuilder {
        MapConfigBuilder::new()
    }

    /// Interpolation parameters derived from this configuration.
    pub fn idw_params(&self) -> IdwParams {
        IdwParams {
            neighbors: self.neighbor_count,
            power: self.idw_power,
            identity: self.identity_weighting.then_some(IdentityWeighting {
                same_cell_boost: self.same_cell_boost,
                mismatch_penalty: self.mismatch_penalty,
            }),
        }
    }

    /// Check every option.
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::InvalidConfig`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if !self.grid_step_deg.is_finite() || self.grid_step_deg <= 0.0 {
            return Err(CellmapError::InvalidConfig {
                field: "grid_step_deg",
                message: format!(
                    "must be a positive finite number (got {})",
                    self.grid_step_deg
                ),
            });
        }
        if !self.margin_deg.is_finite() || self.margin_deg < 0.0 {
            return Err(CellmapError::InvalidConfig {
                field: "margin_deg",
                message: format!(
                    "must be a finite non-negative number (got {})",
                    self.margin_deg
                ),
            });
        }
        if self.max_grid_cells == 0 {
            return Err(CellmapError::InvalidConfig {
                field: "max_grid_cells",
                message: "must be at least 1".to_string(),
            });
        }
        // Boost and penalty are checked even when weighting is off.
        IdwParams {
            identity: Some(IdentityWeighting {
                same_cell_boost: self.same_cell_boost,
                mismatch_penalty: self.mismatch_penalty,
            }),
            ..self.idw_params()
        }
        .validate()
    }
}

/// Builder for [`MapConfig`].
///
/// # Example
///
/// ```
/// use cellmap::{MapConfigBuilder, MetricPreference};
///
/// let config = MapConfigBuilder::new()
///     .metric_preference(MetricPreference::Rsrp)
///     .grid_step_deg(0.001)
///     .tile_alpha(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.neighbor_count, 12);
///
/// assert!(MapConfigBuilder::new().grid_step_deg(0.0).build().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapConfigBuilder {
    config: MapConfig,
}

impl MapConfigBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CELLMAP_METRIC` | `auto`, `RSRP` or `RSSI` | auto |
    /// | `CELLMAP_GRID_STEP_DEG` | Grid step in degrees | 0.0005 |
    /// | `CELLMAP_IDW_NEIGHBORS` | Neighbors per prediction | 12 |
    /// | `CELLMAP_IDW_POWER` | Inverse-distance exponent | 2.0 |
    /// | `CELLMAP_TILE_ALPHA` | Tile alpha (0-255) | 160 |
    /// | `CELLMAP_IDENTITY_WEIGHTING` | `true`/`false` | true |
    /// | `CELLMAP_SAME_CELL_BOOST` | Same-cell weight multiplier | 2.0 |
    /// | `CELLMAP_MISMATCH_PENALTY` | Other-cell weight multiplier | 0.6 |
    /// | `CELLMAP_MARGIN_DEG` | Margin around the samples | 0.002 |
    /// | `CELLMAP_MAX_GRID_CELLS` | Largest allowed grid | 4000000 |
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::InvalidConfig`] if a variable is set but cannot
    /// be parsed. Range checks happen in [`Self::build`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();
        let c = &mut builder.config;

        if let Some(v) = lookup("CELLMAP_METRIC") {
            c.metric_preference = v.parse().map_err(|_| CellmapError::InvalidConfig {
                field: "metric_preference",
                message: format!("expected auto, RSRP or RSSI (got {:?})", v),
            })?;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_GRID_STEP_DEG", "grid_step_deg")? {
            c.grid_step_deg = v;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_IDW_NEIGHBORS", "neighbor_count")? {
            c.neighbor_count = v;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_IDW_POWER", "idw_power")? {
            c.idw_power = v;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_TILE_ALPHA", "tile_alpha")? {
            c.tile_alpha = v;
        }
        if let Some(v) = lookup("CELLMAP_IDENTITY_WEIGHTING") {
            c.identity_weighting = parse_flag(&v).ok_or_else(|| CellmapError::InvalidConfig {
                field: "identity_weighting",
                message: format!("expected true or false (got {:?})", v),
            })?;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_SAME_CELL_BOOST", "same_cell_boost")? {
            c.same_cell_boost = v;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_MISMATCH_PENALTY", "mismatch_penalty")? {
            c.mismatch_penalty = v;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_MARGIN_DEG", "margin_deg")? {
            c.margin_deg = v;
        }
        if let Some(v) = parse_var(&lookup, "CELLMAP_MAX_GRID_CELLS", "max_grid_cells")? {
            c.max_grid_cells = v;
        }

        Ok(builder)
    }

    /// Set the metric selection policy.
    pub fn metric_preference(mut self, preference: MetricPreference) -> Self {
        self.config.metric_preference = preference;
        self
    }

    /// Set the grid step in degrees.
    pub fn grid_step_deg(mut self, step: f64) -> Self {
        self.config.grid_step_deg = step;
        self
    }

    /// Set the number of neighbors per prediction.
    pub fn neighbor_count(mut self, k: usize) -> Self {
        self.config.neighbor_count = k;
        self
    }

    /// Set the inverse-distance exponent.
    pub fn idw_power(mut self, power: f64) -> Self {
        self.config.idw_power = power;
        self
    }

    /// Set the tile alpha.
    pub fn tile_alpha(mut self, alpha: u8) -> Self {
        self.config.tile_alpha = alpha;
        self
    }

    /// Enable or disable serving-cell aware weighting.
    pub fn identity_weighting(mut self, enabled: bool) -> Self {
        self.config.identity_weighting = enabled;
        self
    }

    /// Set the same-cell weight multiplier.
    pub fn same_cell_boost(mut self, boost: f64) -> Self {
        self.config.same_cell_boost = boost;
        self
    }

    /// Set the other-cell weight multiplier.
    pub fn mismatch_penalty(mut self, penalty: f64) -> Self {
        self.config.mismatch_penalty = penalty;
        self
    }

    /// Set the margin around the samples' bounding box.
    pub fn margin_deg(mut self, margin: f64) -> Self {
        self.config.margin_deg = margin;
        self
    }

    /// Set the largest allowed grid.
    pub fn max_grid_cells(mut self, cells: u64) -> Self {
        self.config.max_grid_cells = cells;
        self
    }

    /// Validate and build the [`MapConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::InvalidConfig`] if any option is out of range.
    pub fn build(self) -> Result<MapConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, field: &'static str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CellmapError::InvalidConfig {
                field,
                message: format!("{} is not a valid value (got {:?})", name, raw),
            }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
