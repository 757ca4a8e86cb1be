//! Benchmarks for the calibration pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use encal_algorithms::calibration::{
    calibrate, evaluate_neighbourhoods, CalibrationParams, DistanceCatalog, RingGrouping,
};
use encal_core::Raster;

fn create_maps(size: usize) -> (Raster<i32>, Raster<i32>) {
    let mut before: Raster<i32> = Raster::new(size, size);
    let mut after: Raster<i32> = Raster::new(size, size);

    // Patchy 10-class pattern with about 5% of cells changing
    for row in 0..size {
        for col in 0..size {
            let class = (((row / 7) * 3 + (col / 5) * 7 + (row * col) % 3) % 10) as i32;
            before.set(row, col, class).unwrap();
            let changed = (row * 31 + col * 17) % 20 == 0;
            let next = if changed { (class + 1) % 10 } else { class };
            after.set(row, col, next).unwrap();
        }
    }
    (before, after)
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_neighbourhoods");
    let catalog = DistanceCatalog::new(8, RingGrouping::Exact);

    for size in [128, 256, 512].iter() {
        let (before, after) = create_maps(*size);
        let mask: Raster<i32> = Raster::filled(*size, *size, 1);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                evaluate_neighbourhoods(
                    black_box(&before),
                    black_box(&after),
                    black_box(&mask),
                    10,
                    &catalog,
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_calibrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibrate");
    let params = CalibrationParams::default();

    for size in [128, 256].iter() {
        let (before, after) = create_maps(*size);
        let mask: Raster<i32> = Raster::filled(*size, *size, 1);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| calibrate(black_box(&before), black_box(&after), &mask, &params).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_calibrate);
criterion_main!(benches);
