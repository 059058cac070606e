use anyhow::{Context, Result};
use cellmap::{try_predict, SignalGrade};
use serde::Serialize;
use std::path::PathBuf;

use crate::{FilterArgs, MapArgs};

#[derive(Serialize)]
struct PredictionResponse {
    lat: f64,
    lon: f64,
    signal: Option<f64>,
    metric: Option<&'static str>,
    grade: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub fn run(
    measurements: PathBuf,
    lat: f64,
    lon: f64,
    json: bool,
    map: &MapArgs,
    filters: &FilterArgs,
) -> Result<()> {
    let config = map.to_config().context("Invalid map configuration")?;
    let store = super::load_survey(&measurements, map, filters)?.store();

    let response = match try_predict(&store, lat, lon, &config.idw_params()) {
        Ok(p) => PredictionResponse {
            lat,
            lon,
            signal: Some(p.value),
            metric: Some(p.metric.as_str()),
            grade: Some(SignalGrade::from_value(p.metric, p.value).label()),
            reason: None,
        },
        Err(reason) => PredictionResponse {
            lat,
            lon,
            signal: None,
            metric: None,
            grade: None,
            reason: Some(reason.to_string()),
        },
    };

    // Output result
    if json {
        println!("{}", serde_json::to_string(&response)?);
    } else if let (Some(signal), Some(metric), Some(grade)) =
        (response.signal, response.metric, response.grade)
    {
        println!("{:.2} dBm {} ({})", signal, metric, grade);
    } else {
        println!(
            "no prediction: {}",
            response.reason.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}
