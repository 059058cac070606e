use anyhow::Result;
use cellmap::ingest::{IngestOptions, RadiusFilter};
use cellmap::{MapConfig, MetricKind, MetricPreference};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

/// Cellular coverage maps from drive-test surveys
#[derive(Parser)]
#[command(name = "cellmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Interpolation and rendering options.
#[derive(Args, Debug, Clone)]
pub struct MapArgs {
    /// Metric to map: auto, RSRP or RSSI
    #[arg(long, env = "CELLMAP_METRIC", default_value = "auto")]
    pub metric: MetricPreference,

    /// Grid cell size in degrees
    #[arg(long, env = "CELLMAP_GRID_STEP_DEG", default_value_t = cellmap::config::DEFAULT_GRID_STEP_DEG)]
    pub grid_step_deg: f64,

    /// Neighbours considered per prediction
    #[arg(long, env = "CELLMAP_IDW_NEIGHBORS", default_value_t = cellmap::interpolate::DEFAULT_NEIGHBORS)]
    pub neighbors: usize,

    /// Inverse distance power
    #[arg(long, env = "CELLMAP_IDW_POWER", default_value_t = cellmap::interpolate::DEFAULT_POWER)]
    pub power: f64,

    /// Tile opacity (0-255)
    #[arg(long, env = "CELLMAP_TILE_ALPHA", default_value_t = cellmap::config::DEFAULT_TILE_ALPHA)]
    pub tile_alpha: u8,

    /// Weight all neighbours equally regardless of serving cell
    #[arg(long)]
    pub no_identity_weighting: bool,

    /// Weight factor for neighbours sharing the nearest sample's cell
    #[arg(long, env = "CELLMAP_SAME_CELL_BOOST", default_value_t = cellmap::interpolate::DEFAULT_SAME_CELL_BOOST)]
    pub same_cell_boost: f64,

    /// Weight factor for all other neighbours
    #[arg(long, env = "CELLMAP_MISMATCH_PENALTY", default_value_t = cellmap::interpolate::DEFAULT_MISMATCH_PENALTY)]
    pub mismatch_penalty: f64,

    /// Margin around the survey area in degrees
    #[arg(long, env = "CELLMAP_MARGIN_DEG", default_value_t = cellmap::config::DEFAULT_MARGIN_DEG)]
    pub margin_deg: f64,

    /// Refuse grids with more cells than this
    #[arg(long, env = "CELLMAP_MAX_GRID_CELLS", default_value_t = cellmap::config::DEFAULT_MAX_GRID_CELLS)]
    pub max_grid_cells: u64,
}

impl MapArgs {
    pub fn to_config(&self) -> cellmap::Result<MapConfig> {
        MapConfig::builder()
            .metric_preference(self.metric)
            .grid_step_deg(self.grid_step_deg)
            .neighbor_count(self.neighbors)
            .idw_power(self.power)
            .tile_alpha(self.tile_alpha)
            .identity_weighting(!self.no_identity_weighting)
            .same_cell_boost(self.same_cell_boost)
            .mismatch_penalty(self.mismatch_penalty)
            .margin_deg(self.margin_deg)
            .max_grid_cells(self.max_grid_cells)
            .build()
    }
}

/// Survey row filters.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep only rows of this operator code
    #[arg(long)]
    pub plmn: Option<String>,

    /// Keep only rows at or below this speed
    #[arg(long)]
    pub max_speed: Option<f64>,

    /// Keep only rows dated on or after this (text compare)
    #[arg(long)]
    pub date_from: Option<String>,

    /// Keep only rows dated on or before this (text compare)
    #[arg(long)]
    pub date_to: Option<String>,

    /// Radius filter centre latitude
    #[arg(long, allow_hyphen_values = true, requires_all = ["center_lon", "radius_km"])]
    pub center_lat: Option<f64>,

    /// Radius filter centre longitude
    #[arg(long, allow_hyphen_values = true, requires_all = ["center_lat", "radius_km"])]
    pub center_lon: Option<f64>,

    /// Radius filter in kilometres
    #[arg(long, requires_all = ["center_lat", "center_lon"])]
    pub radius_km: Option<f64>,
}

impl FilterArgs {
    pub fn to_options(&self, metric: MetricPreference) -> IngestOptions {
        let radius = match (self.center_lat, self.center_lon, self.radius_km) {
            (Some(lat), Some(lon), Some(km)) => Some(RadiusFilter::new(lat, lon, km)),
            _ => None,
        };
        IngestOptions {
            metric,
            plmn: self.plmn.clone(),
            max_speed: self.max_speed,
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            radius,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a coverage map (KML or GeoJSON) from a survey
    Generate {
        /// Survey CSV
        measurements: PathBuf,

        /// Output file, .kml or .geojson (default: <measurements>_coverage.kml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Antenna sites CSV (lat, lon, name, id)
        #[arg(long)]
        antennas: Option<PathBuf>,

        /// Include measurement markers but hide them by default (KML)
        #[arg(long, conflicts_with = "no_points")]
        hide_points: bool,

        /// Leave measurement markers out
        #[arg(long)]
        no_points: bool,

        /// Scan the grid on all cores
        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        map: MapArgs,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Predict the signal at a single coordinate
    Query {
        /// Survey CSV
        measurements: PathBuf,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        map: MapArgs,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Predict the signal for every row of a points CSV
    Batch {
        /// Survey CSV
        measurements: PathBuf,

        /// Points CSV
        points: PathBuf,

        /// Output file (default: <points>_signal.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,

        #[command(flatten)]
        map: MapArgs,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Grade a single value and show its colors
    Grade {
        /// Metric of the value: RSRP or RSSI
        #[arg(long)]
        metric: MetricKind,

        /// Value in dBm
        #[arg(long, allow_hyphen_values = true)]
        value: f64,

        /// Ramp color opacity (0-255)
        #[arg(long, default_value_t = cellmap::config::DEFAULT_TILE_ALPHA)]
        alpha: u8,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Summarise a survey
    Info {
        /// Survey CSV
        measurements: PathBuf,

        #[command(flatten)]
        map: MapArgs,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cellmap=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            measurements,
            output,
            antennas,
            hide_points,
            no_points,
            parallel,
            map,
            filters,
        } => commands::generate::run(commands::generate::GenerateOptions {
            measurements,
            output,
            antennas,
            points: if no_points {
                commands::generate::PointsMode::Omit
            } else if hide_points {
                commands::generate::PointsMode::Hidden
            } else {
                commands::generate::PointsMode::Visible
            },
            parallel,
            map,
            filters,
        }),
        Commands::Query {
            measurements,
            lat,
            lon,
            json,
            map,
            filters,
        } => commands::query::run(measurements, lat, lon, json, &map, &filters),
        Commands::Batch {
            measurements,
            points,
            output,
            lat_col,
            lon_col,
            map,
            filters,
        } => commands::batch::run(
            measurements,
            points,
            output,
            &lat_col,
            &lon_col,
            &map,
            &filters,
        ),
        Commands::Grade {
            metric,
            value,
            alpha,
            json,
        } => commands::grade::run(metric, value, alpha, json),
        Commands::Info {
            measurements,
            map,
            filters,
        } => commands::info::run(measurements, &map, &filters),
    }
}
