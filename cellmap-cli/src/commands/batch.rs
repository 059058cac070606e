use anyhow::{Context, Result};
use cellmap::{predict, IdwParams, SampleStore, SignalGrade};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{FilterArgs, MapArgs};

pub fn run(
    measurements: PathBuf,
    input: PathBuf,
    output: Option<PathBuf>,
    lat_col: &str,
    lon_col: &str,
    map: &MapArgs,
    filters: &FilterArgs,
) -> Result<()> {
    let config = map.to_config().context("Invalid map configuration")?;
    let store = super::load_survey(&measurements, map, filters)?.store();

    let output_path = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "points".to_string());
        input.with_file_name(format!("{}_signal.csv", stem))
    });

    let written = process_csv(
        &store,
        &config.idw_params(),
        &input,
        &output_path,
        lat_col,
        lon_col,
        true,
    )?;

    tracing::debug!(rows = written, "Batch prediction finished");
    println!("Output written to: {}", output_path.display());
    Ok(())
}

/// Append `signal`, `metric` and `grade` columns to every row of `input`.
///
/// Rows without a prediction get empty cells. Returns the number of rows
/// written.
fn process_csv(
    store: &SampleStore,
    params: &IdwParams,
    input: &Path,
    output: &Path,
    lat_col: &str,
    lon_col: &str,
    show_progress: bool,
) -> Result<usize> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let lat_idx = headers
        .iter()
        .position(|h| h.trim() == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;
    let lon_idx = headers
        .iter()
        .position(|h| h.trim() == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;

    // Collect records for progress bar
    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;

    let pb = if show_progress {
        ProgressBar::new(records.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let output_file = File::create(output).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.extend(["signal", "metric", "grade"]);
    writer.write_record(&new_headers)?;

    for (i, record) in records.iter().enumerate() {
        let lat: f64 = record
            .get(lat_idx)
            .context("Missing latitude")?
            .trim()
            .parse()
            .with_context(|| format!("Invalid latitude on row {}", i + 1))?;
        let lon: f64 = record
            .get(lon_idx)
            .context("Missing longitude")?
            .trim()
            .parse()
            .with_context(|| format!("Invalid longitude on row {}", i + 1))?;

        let (signal, metric, grade) = match predict(store, lat, lon, params) {
            Some(p) => (
                format!("{:.2}", p.value),
                p.metric.as_str(),
                SignalGrade::from_value(p.metric, p.value).label(),
            ),
            None => (String::new(), "", ""),
        };

        let mut new_record: Vec<&str> = record.iter().collect();
        new_record.extend([signal.as_str(), metric, grade]);
        writer.write_record(&new_record)?;

        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellmap::{MetricKind, Sample};
    use tempfile::TempDir;

    fn store() -> SampleStore {
        SampleStore::new(vec![
            Sample::new(32.1000, 35.1900, -92.0, MetricKind::Rsrp),
            Sample::new(32.1010, 35.1910, -104.0, MetricKind::Rsrp),
        ])
    }

    #[test]
    fn test_process_csv_appends_columns() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("points.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "id,lat,lon\na,32.1000,35.1900\nb,40.0,10.0\n").unwrap();

        let rows = process_csv(
            &store(),
            &IdwParams::default(),
            &input,
            &output,
            "lat",
            "lon",
            false,
        )
        .unwrap();
        assert_eq!(rows, 2);

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,lat,lon,signal,metric,grade");
        assert_eq!(lines[1], "a,32.1000,35.1900,-92.00,RSRP,good");
        assert_eq!(lines[2], "b,40.0,10.0,,,");
    }

    #[test]
    fn test_process_csv_missing_column() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("points.csv");
        std::fs::write(&input, "y,x\n1,2\n").unwrap();

        let err = process_csv(
            &store(),
            &IdwParams::default(),
            &input,
            &dir.path().join("out.csv"),
            "lat",
            "lon",
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'lat'"));
    }

    #[test]
    fn test_process_csv_invalid_latitude() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("points.csv");
        std::fs::write(&input, "lat,lon\nnorth,35.19\n").unwrap();

        let err = process_csv(
            &store(),
            &IdwParams::default(),
            &input,
            &dir.path().join("out.csv"),
            "lat",
            "lon",
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
