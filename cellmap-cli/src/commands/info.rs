use anyhow::{Context, Result};
use cellmap::{CellmapError, MetricKind, SignalGrade, Surface};
use std::path::PathBuf;

use crate::{FilterArgs, MapArgs};

pub fn run(measurements: PathBuf, map: &MapArgs, filters: &FilterArgs) -> Result<()> {
    let config = map.to_config().context("Invalid map configuration")?;
    let survey = super::load_survey(&measurements, map, filters)?;
    let store = survey.store();
    let stats = survey.stats;

    println!("Survey: {}", measurements.display());
    println!();
    println!("Rows: {}", stats.rows);
    println!("Kept: {}", stats.kept);
    if stats.skipped() > 0 {
        println!(
            "Skipped: {} ({} bad coordinates, {} filtered, no {} value: {})",
            stats.skipped(),
            stats.bad_coordinates,
            stats.filtered,
            config.metric_preference,
            stats.no_metric
        );
    }
    println!(
        "Metrics: {} RSRP, {} RSSI",
        store.count_metric(MetricKind::Rsrp),
        store.count_metric(MetricKind::Rssi)
    );

    let Some(bounds) = store.bounds() else {
        println!();
        println!("No usable measurements");
        return Ok(());
    };

    println!(
        "Bounds: {:.6},{:.6} to {:.6},{:.6}",
        bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon
    );
    println!();

    let mut histogram = [0usize; SignalGrade::ALL.len()];
    for sample in &store {
        histogram[SignalGrade::of_sample(sample) as usize] += 1;
    }
    println!("Grades:");
    for (grade, count) in SignalGrade::ALL.iter().zip(histogram) {
        let pct = count as f64 / store.len() as f64 * 100.0;
        println!(
            "  {:<10} {:<7} {:>6} ({:.1}%)",
            grade.label(),
            grade.style_id(),
            count,
            pct
        );
    }
    println!();

    match Surface::new(&store, &config) {
        Ok(surface) => {
            if let Some(grid) = surface.grid() {
                println!(
                    "Grid at {}°: {} x {} = {} cells",
                    grid.step(),
                    grid.rows(),
                    grid.cols(),
                    grid.cell_count()
                );
            }
        }
        Err(CellmapError::GridTooLarge { cells, limit }) => {
            println!(
                "Grid at {}°: {} cells (over the {} cell limit)",
                config.grid_step_deg, cells, limit
            );
        }
        Err(e) => return Err(e).context("Failed to size coverage grid"),
    }

    Ok(())
}
