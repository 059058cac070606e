//! Grid surface generation.
//!
//! A [`Surface`] lays a regular degree grid over the survey area, predicts the
//! signal at the lower-left corner of every cell and yields a colored
//! [`Tile`] for each cell that has a prediction. Cells without nearby
//! evidence produce nothing, so the surface is gappy near the data boundary.
//!
//! Tiles are produced lazily in row-major order (latitude, then longitude);
//! identical inputs always produce identical sequences.

use std::iter::FusedIterator;

use crate::config::MapConfig;
use crate::error::{CellmapError, Result};
use crate::geo::BoundingBox;
use crate::grade::{continuous_color, Rgba};
use crate::interpolate::{predict, IdwParams};
use crate::sample::{MetricKind, SampleStore};

/// Tolerance for the inclusive upper grid bound.
const GRID_EPSILON: f64 = 1e-9;

/// One colored grid cell of the interpolated surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
    /// Predicted value at the cell's lower-left corner.
    pub value: f64,
    /// Metric the value is expressed in.
    pub metric: MetricKind,
    /// Fill color from the continuous ramp.
    pub color: Rgba,
}

/// Dimensions of a scan grid.
///
/// Rows and columns both include the upper bound: the last row starts at or
/// just below `max_lat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    bounds: BoundingBox,
    step: f64,
    rows: usize,
    cols: usize,
}

impl GridSpec {
    /// Lay a grid with `step` degrees over `bounds`.
    ///
    /// `step` must be positive and the bounds ordered; [`Surface`] checks both.
    pub fn new(bounds: BoundingBox, step: f64) -> Self {
        Self {
            bounds,
            step,
            rows: steps_inclusive(bounds.lat_span(), step),
            cols: steps_inclusive(bounds.lon_span(), step),
        }
    }

    /// Area covered by the grid's cell corners.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Cell size in degrees.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of latitude rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of longitude columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> u64 {
        (self.rows as u64).saturating_mul(self.cols as u64)
    }

    /// Lower-left corner `(lat, lon)` of a cell.
    pub fn corner(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.bounds.min_lat + row as f64 * self.step,
            self.bounds.min_lon + col as f64 * self.step,
        )
    }
}

fn steps_inclusive(span: f64, step: f64) -> usize {
    if span <= 0.0 {
        return 1;
    }
    // Saturates for absurdly fine steps so the cell cap rejects the grid.
    ((span / step + GRID_EPSILON).floor() as usize).saturating_add(1)
}

/// A prepared, validated scan over a sample store.
///
/// # Example
///
/// ```
/// use cellmap::{MapConfig, MetricKind, Sample, SampleStore, Surface};
///
/// let store = SampleStore::new(vec![
///     Sample::new(32.100, 35.190, -95.0, MetricKind::Rsrp),
///     Sample::new(32.102, 35.193, -110.0, MetricKind::Rsrp),
/// ]);
///
/// let surface = Surface::new(&store, &MapConfig::default()).unwrap();
/// let tiles: Vec<_> = surface.tiles().collect();
/// assert!(!tiles.is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Surface<'a> {
    store: &'a SampleStore,
    grid: Option<GridSpec>,
    params: IdwParams,
    alpha: u8,
}

impl<'a> Surface<'a> {
    /// Scan the samples' bounding box, grown by the configured margin.
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::InvalidConfig`] for an invalid configuration and
    /// [`CellmapError::GridTooLarge`] when the grid exceeds
    /// `config.max_grid_cells`. An empty store is not an error: its surface
    /// simply has no tiles.
    pub fn new(store: &'a SampleStore, config: &MapConfig) -> Result<Self> {
        config.validate()?;
        let grid = store
            .bounds()
            .map(|b| GridSpec::new(b.expand(config.margin_deg), config.grid_step_deg));
        Self::with_grid(store, grid, config)
    }

    /// Scan an explicit area instead of the samples' bounding box.
    ///
    /// # Errors
    ///
    /// As [`Self::new`], plus [`CellmapError::InvalidConfig`] when `bounds` is
    /// not finite or not ordered.
    pub fn within(
        store: &'a SampleStore,
        bounds: BoundingBox,
        config: &MapConfig,
    ) -> Result<Self> {
        config.validate()?;
        let finite = [bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon]
            .iter()
            .all(|v| v.is_finite());
        if !finite || bounds.min_lat > bounds.max_lat || bounds.min_lon > bounds.max_lon {
            return Err(CellmapError::InvalidConfig {
                field: "bounds",
                message: format!("expected finite min <= max (got {:?})", bounds),
            });
        }
        let grid = (!store.is_empty()).then(|| GridSpec::new(bounds, config.grid_step_deg));
        Self::with_grid(store, grid, config)
    }

    fn with_grid(
        store: &'a SampleStore,
        grid: Option<GridSpec>,
        config: &MapConfig,
    ) -> Result<Self> {
        if let Some(g) = grid {
            if g.cell_count() > config.max_grid_cells {
                return Err(CellmapError::GridTooLarge {
                    cells: g.cell_count(),
                    limit: config.max_grid_cells,
                });
            }
            tracing::debug!(
                rows = g.rows(),
                cols = g.cols(),
                step_deg = g.step(),
                samples = store.len(),
                "Prepared coverage grid"
            );
        }

        Ok(Self {
            store,
            grid,
            params: config.idw_params(),
            alpha: config.tile_alpha,
        })
    }

    /// The scan grid, or `None` when there are no samples.
    pub fn grid(&self) -> Option<&GridSpec> {
        self.grid.as_ref()
    }

    /// Number of rows to scan (zero without samples).
    pub fn rows(&self) -> usize {
        self.grid.map_or(0, |g| g.rows())
    }

    /// Predict and color a single cell.
    pub fn cell(&self, row: usize, col: usize) -> Option<Tile> {
        let grid = self.grid?;
        let (lat, lon) = grid.corner(row, col);
        let p = predict(self.store, lat, lon, &self.params)?;
        Some(Tile {
            lat_min: lat,
            lon_min: lon,
            lat_max: lat + grid.step(),
            lon_max: lon + grid.step(),
            value: p.value,
            metric: p.metric,
            color: continuous_color(p.metric, p.value, self.alpha),
        })
    }

    /// Tiles of one latitude row, west to east.
    pub fn row(&self, row: usize) -> impl Iterator<Item = Tile> + 'a {
        let surface = *self;
        let cols = self.grid.map_or(0, |g| g.cols());
        (0..cols).filter_map(move |col| surface.cell(row, col))
    }

    /// Lazy row-major iterator over every tile.
    pub fn tiles(&self) -> Tiles<'a> {
        Tiles {
            surface: *self,
            row: 0,
            col: 0,
        }
    }

    /// All tiles, computed on the rayon thread pool one row per task.
    ///
    /// The result is in the same order as [`Self::tiles`].
    #[cfg(feature = "parallel")]
    pub fn par_tiles(&self) -> Vec<Tile> {
        use rayon::prelude::*;

        let surface = *self;
        (0..self.rows())
            .into_par_iter()
            .flat_map_iter(move |row| surface.row(row))
            .collect()
    }
}

/// Row-major tile iterator returned by [`Surface::tiles`].
#[derive(Debug, Clone)]
pub struct Tiles<'a> {
    surface: Surface<'a>,
    row: usize,
    col: usize,
}

impl Tiles<'_> {
    fn remaining_cells(&self) -> usize {
        match self.surface.grid {
            Some(g) if self.row < g.rows() => (g.rows() - self.row)
                .saturating_mul(g.cols())
                .saturating_sub(self.col),
            _ => 0,
        }
    }
}

impl Iterator for Tiles<'_> {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let grid = self.surface.grid?;
        while self.row < grid.rows() {
            let (row, col) = (self.row, self.col);
            self.col += 1;
            if self.col >= grid.cols() {
                self.col = 0;
                self.row += 1;
            }
            if let Some(tile) = self.surface.cell(row, col) {
                return Some(tile);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining_cells()))
    }
}

impl FusedIterator for Tiles<'_> {}

/// Scan the samples' area and return the lazy tile sequence.
///
/// Shorthand for `Surface::new(store, config)?.tiles()`.
pub fn build_surface<'a>(store: &'a SampleStore, config: &MapConfig) -> Result<Tiles<'a>> {
    Ok(Surface::new(store, config)?.tiles())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfigBuilder;
    use crate::sample::Sample;

    fn survey() -> SampleStore {
        SampleStore::new(vec![
            Sample::new(32.1000, 35.1900, -85.0, MetricKind::Rsrp).with_cell_id(1),
            Sample::new(32.1010, 35.1915, -97.0, MetricKind::Rsrp).with_cell_id(1),
            Sample::new(32.1022, 35.1890, -112.0, MetricKind::Rsrp).with_cell_id(2),
            Sample::new(32.0995, 35.1930, -76.0, MetricKind::Rssi),
        ])
    }

    #[test]
    fn test_empty_store_produces_no_tiles() {
        let store = SampleStore::default();
        let config = MapConfig::default();

        assert_eq!(build_surface(&store, &config).unwrap().count(), 0);

        let area = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let surface = Surface::within(&store, area, &config).unwrap();
        assert!(surface.grid().is_none());
        assert_eq!(surface.tiles().count(), 0);
        assert_eq!(surface.rows(), 0);
    }

    #[test]
    fn test_grid_dimensions_inclusive() {
        let grid = GridSpec::new(BoundingBox::new(10.0, 20.0, 10.004, 20.002), 0.001);
        assert_eq!(grid.rows(), 5);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.cell_count(), 15);

        let (lat, lon) = grid.corner(4, 2);
        assert!((lat - 10.004).abs() < 1e-12);
        assert!((lon - 20.002).abs() < 1e-12);

        // A degenerate box still has one cell
        let grid = GridSpec::new(BoundingBox::new(1.0, 1.0, 1.0, 1.0), 0.001);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn test_grid_covers_margin() {
        let store = SampleStore::new(vec![Sample::new(32.1, 35.2, -90.0, MetricKind::Rsrp)]);
        let surface = Surface::new(&store, &MapConfig::default()).unwrap();
        let grid = surface.grid().unwrap();

        assert!((grid.bounds().min_lat - 32.098).abs() < 1e-12);
        assert!((grid.bounds().max_lon - 35.202).abs() < 1e-12);
        // 0.004 degrees at 0.0005 steps, both ends included
        assert_eq!(grid.rows(), 9);
        assert_eq!(grid.cols(), 9);
    }

    #[test]
    fn test_single_sample_fills_grid() {
        let store = SampleStore::new(vec![Sample::new(32.1, 35.2, -90.0, MetricKind::Rsrp)]);
        let config = MapConfig::default();
        let tiles: Vec<Tile> = build_surface(&store, &config).unwrap().collect();

        // Every corner lies within ~320 m of the sample
        assert_eq!(tiles.len(), 81);
        for tile in &tiles {
            assert!((tile.value - -90.0).abs() < 1e-9);
            assert_eq!(tile.metric, MetricKind::Rsrp);
            assert_eq!(tile.color, continuous_color(MetricKind::Rsrp, tile.value, 160));
            assert!((tile.lat_max - tile.lat_min - 0.0005).abs() < 1e-12);
            assert!((tile.lon_max - tile.lon_min - 0.0005).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tiles_are_row_major() {
        let store = survey();
        let tiles: Vec<Tile> = build_surface(&store, &MapConfig::default()).unwrap().collect();
        assert!(tiles.len() > 1);

        for pair in tiles.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.lat_min < b.lat_min || (a.lat_min == b.lat_min && a.lon_min < b.lon_min),
                "tiles out of order: {:?} then {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_scan_is_deterministic() {
        let store = survey();
        let config = MapConfig::default();
        let first: Vec<Tile> = build_surface(&store, &config).unwrap().collect();
        let second: Vec<Tile> = build_surface(&store, &config).unwrap().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rows_match_full_scan() {
        let store = survey();
        let surface = Surface::new(&store, &MapConfig::default()).unwrap();
        let by_rows: Vec<Tile> = (0..surface.rows()).flat_map(|r| surface.row(r)).collect();
        let scanned: Vec<Tile> = surface.tiles().collect();
        assert_eq!(by_rows, scanned);
    }

    #[test]
    fn test_distant_clusters_leave_gaps() {
        // Two clusters ~11 km apart: the middle of the grid has no evidence
        let store = SampleStore::new(vec![
            Sample::new(32.00, 35.00, -90.0, MetricKind::Rsrp),
            Sample::new(32.10, 35.00, -100.0, MetricKind::Rsrp),
        ]);
        let config = MapConfigBuilder::new().grid_step_deg(0.002).build().unwrap();
        let surface = Surface::new(&store, &config).unwrap();
        let cells = surface.grid().unwrap().cell_count() as usize;
        let tiles: Vec<Tile> = surface.tiles().collect();

        assert!(!tiles.is_empty());
        assert!(tiles.len() < cells);
        assert!(tiles.iter().all(|t| t.lat_min < 32.02 || t.lat_min > 32.08));
    }

    #[test]
    fn test_size_hint_bounds_remaining_cells() {
        let store = survey();
        let surface = Surface::new(&store, &MapConfig::default()).unwrap();
        let cells = surface.grid().unwrap().cell_count() as usize;

        let mut tiles = surface.tiles();
        assert_eq!(tiles.size_hint(), (0, Some(cells)));
        tiles.next();
        let (_, upper) = tiles.size_hint();
        assert!(upper.unwrap() < cells);
    }

    #[test]
    fn test_invalid_config_fails_before_scan() {
        let store = survey();
        let config = MapConfig {
            grid_step_deg: 0.0,
            ..MapConfig::default()
        };
        assert!(matches!(
            build_surface(&store, &config),
            Err(CellmapError::InvalidConfig { field: "grid_step_deg", .. })
        ));
    }

    #[test]
    fn test_grid_too_large() {
        let store = survey();
        let config = MapConfigBuilder::new()
            .grid_step_deg(0.000001)
            .build()
            .unwrap();
        assert!(matches!(
            Surface::new(&store, &config),
            Err(CellmapError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_vanishing_step_is_too_large() {
        let store = SampleStore::new(vec![Sample::new(32.1, 35.19, -90.0, MetricKind::Rsrp)]);
        let config = MapConfigBuilder::new()
            .grid_step_deg(1e-300)
            .build()
            .unwrap();

        match Surface::new(&store, &config) {
            Err(CellmapError::GridTooLarge { cells, limit }) => {
                assert_eq!(cells, u64::MAX);
                assert_eq!(limit, 4_000_000);
            }
            other => panic!("Expected GridTooLarge, got {:?}", other.map(|s| s.rows())),
        }
    }

    #[test]
    fn test_size_hint_saturates_without_cap() {
        let store = SampleStore::new(vec![Sample::new(32.1, 35.19, -90.0, MetricKind::Rsrp)]);
        let config = MapConfigBuilder::new()
            .grid_step_deg(1e-300)
            .max_grid_cells(u64::MAX)
            .build()
            .unwrap();

        let surface = Surface::new(&store, &config).unwrap();
        assert_eq!(surface.rows(), usize::MAX);
        assert_eq!(surface.tiles().size_hint(), (0, Some(usize::MAX)));
    }

    #[test]
    fn test_within_rejects_unordered_bounds() {
        let store = survey();
        let result = Surface::within(
            &store,
            BoundingBox::new(32.2, 35.0, 32.1, 35.1),
            &MapConfig::default(),
        );
        assert!(matches!(
            result,
            Err(CellmapError::InvalidConfig { field: "bounds", .. })
        ));
    }

    #[test]
    fn test_within_uses_given_area() {
        let store = survey();
        let bounds = BoundingBox::new(32.100, 35.190, 32.101, 35.191);
        let surface = Surface::within(&store, bounds, &MapConfig::default()).unwrap();
        let tiles: Vec<Tile> = surface.tiles().collect();
        assert_eq!(tiles.len(), 9);
        for tile in &tiles {
            assert!(tile.lat_min >= bounds.min_lat && tile.lat_min <= bounds.max_lat + 1e-9);
            assert!(tile.lon_min >= bounds.min_lon && tile.lon_min <= bounds.max_lon + 1e-9);
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let store = survey();
        let surface = Surface::new(&store, &MapConfig::default()).unwrap();
        assert_eq!(surface.par_tiles(), surface.tiles().collect::<Vec<_>>());
    }
}
