use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cellmap::{predict, IdwParams, MapConfig, MetricKind, Sample, SampleStore, Surface};

/// A synthetic drive: a lattice of samples served by a handful of cells.
fn survey(points: usize) -> SampleStore {
    (0..points)
        .map(|i| {
            let row = (i / 40) as f64;
            let col = (i % 40) as f64;
            let value = -80.0 - ((i * 7) % 45) as f64;
            Sample::new(32.10 + row * 0.0004, 35.19 + col * 0.0004, value, MetricKind::Rsrp)
                .with_cell_id((i % 5) as u64)
        })
        .collect()
}

fn bench_single_prediction(c: &mut Criterion) {
    let store = survey(2000);
    let params = IdwParams::default();

    c.bench_function("single_prediction", |b| {
        b.iter(|| {
            black_box(predict(
                &store,
                black_box(32.105),
                black_box(35.197),
                &params,
            ));
        });
    });
}

fn bench_surface_scan(c: &mut Criterion) {
    let store = survey(1600);
    let config = MapConfig::builder().grid_step_deg(0.0005).build().unwrap();

    c.bench_function("surface_scan", |b| {
        b.iter(|| {
            let surface = Surface::new(&store, &config).unwrap();
            black_box(surface.tiles().count());
        });
    });
}

#[cfg(feature = "parallel")]
fn bench_surface_scan_parallel(c: &mut Criterion) {
    let store = survey(1600);
    let config = MapConfig::builder().grid_step_deg(0.0005).build().unwrap();

    c.bench_function("surface_scan_parallel", |b| {
        b.iter(|| {
            let surface = Surface::new(&store, &config).unwrap();
            black_box(surface.par_tiles().len());
        });
    });
}

#[cfg(not(feature = "parallel"))]
criterion_group!(benches, bench_single_prediction, bench_surface_scan);

#[cfg(feature = "parallel")]
criterion_group!(
    benches,
    bench_single_prediction,
    bench_surface_scan,
    bench_surface_scan_parallel
);

criterion_main!(benches);
