use anyhow::Result;
use cellmap::{continuous_color, MetricKind, SignalGrade};
use serde::Serialize;

#[derive(Serialize)]
struct GradeResponse {
    metric: &'static str,
    value: f64,
    grade: &'static str,
    style: &'static str,
    marker_color: String,
    ramp_color: String,
    ramp_color_kml: String,
}

pub fn run(metric: MetricKind, value: f64, alpha: u8, json: bool) -> Result<()> {
    let grade = SignalGrade::from_value(metric, value);
    let ramp = continuous_color(metric, value, alpha);

    let response = GradeResponse {
        metric: metric.as_str(),
        value,
        grade: grade.label(),
        style: grade.style_id(),
        marker_color: grade.marker_color().to_css_hex(),
        ramp_color: ramp.to_css_hex(),
        ramp_color_kml: ramp.to_kml_hex(),
    };

    if json {
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{} dBm {}: {}", response.value, response.metric, response.grade);
        println!("Style: {} (marker {})", response.style, response.marker_color);
        println!(
            "Ramp color: {} (KML {}, alpha {})",
            response.ramp_color, response.ramp_color_kml, alpha
        );
    }

    Ok(())
}
