use anyhow::{bail, Context, Result};
use cellmap::geojson::{sample_to_feature, tile_to_feature};
use cellmap::ingest::{read_antennas, Antenna, Measurement};
use cellmap::{Surface, Tile};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::render::kml::KmlWriter;
use crate::{FilterArgs, MapArgs};

const DOCUMENT_NAME: &str = "Coverage map (graded points + IDW tiles)";

/// How survey markers appear in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsMode {
    Visible,
    Hidden,
    Omit,
}

pub struct GenerateOptions {
    pub measurements: PathBuf,
    pub output: Option<PathBuf>,
    pub antennas: Option<PathBuf>,
    pub points: PointsMode,
    pub parallel: bool,
    pub map: MapArgs,
    pub filters: FilterArgs,
}

enum Format {
    Kml,
    GeoJson,
}

pub fn run(opts: GenerateOptions) -> Result<()> {
    let config = opts.map.to_config().context("Invalid map configuration")?;
    let survey = super::load_survey(&opts.measurements, &opts.map, &opts.filters)?;
    let store = survey.store();

    let antennas = match &opts.antennas {
        Some(path) if path.exists() => read_antennas(path)
            .with_context(|| format!("Failed to read antennas from {}", path.display()))?,
        Some(path) => {
            tracing::warn!(path = %path.display(), "Antenna file not found, skipping");
            Vec::new()
        }
        None => Vec::new(),
    };

    let output_path = opts.output.clone().unwrap_or_else(|| {
        let stem = opts
            .measurements
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "survey".to_string());
        opts.measurements
            .with_file_name(format!("{}_coverage.kml", stem))
    });

    let extension = output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let format = match extension.as_str() {
        "kml" => Format::Kml,
        "geojson" | "json" => Format::GeoJson,
        _ => bail!(
            "Unsupported output format: {}. Use .kml or .geojson",
            extension
        ),
    };

    let surface = Surface::new(&store, &config).context("Failed to prepare coverage grid")?;
    let points = match opts.points {
        PointsMode::Omit => &[][..],
        _ => &survey.measurements[..],
    };

    let tile_count = match format {
        Format::Kml => write_kml(
            &output_path,
            &surface,
            opts.parallel,
            points,
            opts.points == PointsMode::Visible,
            &antennas,
        )?,
        Format::GeoJson => write_geojson(&output_path, &surface, opts.parallel, points, &antennas)?,
    };

    println!(
        "Kept {} of {} survey rows, {} tiles",
        survey.stats.kept, survey.stats.rows, tile_count
    );
    println!("Output written to: {}", output_path.display());
    Ok(())
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Scan the grid row by row, handing each tile to `sink`.
fn scan<F>(surface: &Surface<'_>, parallel: bool, mut sink: F) -> Result<usize>
where
    F: FnMut(&Tile) -> Result<()>,
{
    let mut count = 0;

    if parallel {
        let pb = ProgressBar::new_spinner();
        pb.set_message("Scanning grid on all cores");
        let tiles = surface.par_tiles();
        pb.finish_and_clear();
        for tile in &tiles {
            sink(tile)?;
            count += 1;
        }
        return Ok(count);
    }

    let pb = progress_bar(surface.rows() as u64)?;
    for row in 0..surface.rows() {
        for tile in surface.row(row) {
            sink(&tile)?;
            count += 1;
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    Ok(count)
}

fn write_kml(
    path: &Path,
    surface: &Surface<'_>,
    parallel: bool,
    points: &[Measurement],
    points_visible: bool,
    antennas: &[Antenna],
) -> Result<usize> {
    let file = File::create(path).context("Failed to create output file")?;
    let mut kml = KmlWriter::start(BufWriter::new(file), DOCUMENT_NAME)?;

    kml.begin_folder("Prediction (IDW tiles)", true)?;
    let count = scan(surface, parallel, |tile| Ok(kml.tile(tile)?))?;
    kml.end_folder()?;

    if !points.is_empty() {
        kml.begin_folder("Measurements", points_visible)?;
        for measurement in points {
            kml.measurement(measurement)?;
        }
        kml.end_folder()?;
    }

    kml.begin_folder("Antennas", true)?;
    for antenna in antennas {
        kml.antenna(antenna)?;
    }
    kml.end_folder()?;

    kml.finish()?;
    Ok(count)
}

fn write_geojson(
    path: &Path,
    surface: &Surface<'_>,
    parallel: bool,
    points: &[Measurement],
    antennas: &[Antenna],
) -> Result<usize> {
    let mut features = Vec::new();
    let count = scan(surface, parallel, |tile| {
        features.push(tile_to_feature(tile));
        Ok(())
    })?;

    features.extend(points.iter().map(|m| {
        let mut feature = sample_to_feature(&m.sample);
        if let Some(props) = feature.properties.as_mut() {
            props.insert("name".into(), m.name.clone().into());
        }
        feature
    }));
    features.extend(antennas.iter().map(antenna_feature));

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let file = File::create(path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;
    Ok(count)
}

fn antenna_feature(antenna: &Antenna) -> geojson::Feature {
    let mut props = geojson::JsonObject::new();
    props.insert("name".into(), antenna.name.clone().into());
    props.insert("kind".into(), "antenna".into());
    if let Some(id) = &antenna.id {
        props.insert("id".into(), id.clone().into());
    }
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
            antenna.lon,
            antenna.lat,
        ]))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}
