//! Build a coverage surface from a synthetic drive test.
//!
//! Run with: cargo run --example synthetic_survey

use cellmap::{
    build_surface, grade, predict, try_predict, CellmapError, IdwParams, MapConfig, MetricKind,
    Sample, SampleStore,
};

fn main() -> Result<(), CellmapError> {
    // Two cells: a strong one to the south-west, a weak one to the north-east
    let mut samples = Vec::new();
    for i in 0..30 {
        let t = i as f64 / 29.0;
        let lat = 32.100 + t * 0.006;
        let lon = 35.190 + t * 0.006;
        let (cell, value) = if t < 0.5 {
            (1001, -82.0 - t * 30.0)
        } else {
            (2002, -100.0 - (t - 0.5) * 30.0)
        };
        samples.push(Sample::new(lat, lon, value, MetricKind::Rsrp).with_cell_id(cell));
    }
    let store = SampleStore::new(samples);

    println!("Point predictions:");
    println!("{:-<50}", "");
    let params = IdwParams::default();
    for (lat, lon) in [(32.1000, 35.1900), (32.1040, 35.1930), (32.2, 35.3)] {
        match try_predict(&store, lat, lon, &params) {
            Ok(p) => println!(
                "({:.4}, {:.4}): {:.1} dBm {} ({})",
                lat,
                lon,
                p.value,
                p.metric,
                grade(p.metric, p.value)
            ),
            Err(reason) => println!("({:.4}, {:.4}): no prediction, {}", lat, lon, reason),
        }
    }

    // Identity weighting versus plain IDW at a point between the two cells
    let (lat, lon) = (32.1032, 35.1928);
    let weighted = predict(&store, lat, lon, &IdwParams::default());
    let plain = predict(&store, lat, lon, &IdwParams::unweighted());
    println!(
        "\nBetween cells: weighted {:?}, plain {:?}",
        weighted.map(|p| p.value),
        plain.map(|p| p.value)
    );

    let config = MapConfig::builder().grid_step_deg(0.0005).build()?;
    let tiles: Vec<_> = build_surface(&store, &config)?.collect();

    let mut histogram = [0usize; 6];
    for tile in &tiles {
        histogram[grade(tile.metric, tile.value) as usize] += 1;
    }

    println!("\nSurface: {} tiles", tiles.len());
    for (g, count) in cellmap::SignalGrade::ALL.iter().zip(histogram) {
        println!("  {:<10} {}", g.label(), count);
    }

    Ok(())
}
