//! Benchmarks for the per-scene stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fieldndvi_algorithms::imagery::{ndvi, NdviParams};
use fieldndvi_algorithms::statistics::scene_mean;
use fieldndvi_algorithms::vector::{clip_raster, ClipParams};
use fieldndvi_core::{Boundary, GeoTransform, Raster};
use geo_types::polygon;
use ndarray::Array3;

fn create_scene(size: usize) -> Raster<u16> {
    let data = Array3::from_shape_fn((4, size, size), |(band, row, col)| {
        (100 * (band + 1) + (row * 7 + col * 13) % 200) as u16
    });
    let mut r = Raster::from_array3(data);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    r
}

/// Octagon inscribed in the grid, so most pixels need a full polygon test
fn create_boundary(size: usize) -> Boundary {
    let s = size as f64;
    let (a, b) = (0.3 * s, 0.7 * s);
    Boundary::new(vec![polygon![
        (x: a, y: 0.0),
        (x: b, y: 0.0),
        (x: s, y: a),
        (x: s, y: b),
        (x: b, y: s),
        (x: a, y: s),
        (x: 0.0, y: b),
        (x: 0.0, y: a),
        (x: a, y: 0.0),
    ]])
    .unwrap()
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndvi");
    for size in [256, 512, 1024, 2048] {
        let scene = create_scene(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndvi(black_box(&scene), &NdviParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_clip(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector/clip");
    for size in [256, 512, 1024] {
        let index = ndvi(&create_scene(size), &NdviParams::default()).unwrap();
        let boundary = create_boundary(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| clip_raster(black_box(&index), &boundary, &ClipParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics/scene_mean");
    for size in [256, 1024, 2048] {
        let index = ndvi(&create_scene(size), &NdviParams::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| scene_mean(black_box(&index)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ndvi, bench_clip, bench_mean);
criterion_main!(benches);
