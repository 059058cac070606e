pub mod batch;
pub mod generate;
pub mod grade;
pub mod info;
pub mod query;

use anyhow::{Context, Result};
use cellmap::ingest::{read_measurements, Ingested};
use std::path::Path;

use crate::{FilterArgs, MapArgs};

/// Read a survey with the command's metric preference and filters.
pub fn load_survey(path: &Path, map: &MapArgs, filters: &FilterArgs) -> Result<Ingested> {
    let ingested = read_measurements(path, &filters.to_options(map.metric))
        .with_context(|| format!("Failed to read measurements from {}", path.display()))?;

    if ingested.stats.skipped() > 0 {
        tracing::warn!(
            path = %path.display(),
            rows = ingested.stats.rows,
            skipped = ingested.stats.skipped(),
            "Some survey rows were skipped"
        );
    }
    Ok(ingested)
}
