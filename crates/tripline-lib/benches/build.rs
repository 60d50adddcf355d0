//! Performance benchmarks for tripline-lib
//!
//! Run with: cargo bench --package tripline-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tripline_lib::{
    CompiledStyle, Filter, GeometryBuilder, Properties, StyleRule, Symbol, Trip, TripInput,
    WebMercatorProjector,
};

/// Generate a wiggly trip with one timestamp per second
fn generate_trip(num_points: usize, base_lat: f64, base_lon: f64, vehicle: usize) -> Trip {
    let coords: Vec<(f64, f64)> = (0..num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            let lat = base_lat + t * 0.1 + (t * 50.0).sin() * 0.001;
            let lon = base_lon + t * 0.1 + (t * 30.0).cos() * 0.001;
            (lon, lat)
        })
        .collect();
    let times = (0..num_points).map(|i| i as f64).collect();
    let mut properties = Properties::new();
    properties.insert("vendor".into(), (vehicle % 3).into());
    Trip::new(coords.into(), times, properties).unwrap()
}

/// Generate multiple trips spread across an area
fn generate_trips(num_trips: usize, points_per_trip: usize) -> TripInput {
    (0..num_trips)
        .map(|i| {
            let lat_offset = (i % 10) as f64 * 0.1;
            let lon_offset = (i / 10) as f64 * 0.1;
            generate_trip(points_per_trip, 40.7 + lat_offset, -74.0 + lon_offset, i)
        })
        .collect()
}

fn vendor_style() -> CompiledStyle {
    CompiledStyle::compile([
        StyleRule::new(Filter::equals("vendor", 0), Symbol::new("#ff0000")),
        StyleRule::new(
            Filter::equals("vendor", 1),
            Symbol::new("rgb(0, 0, 255)").with_opacity(0.5),
        ),
        StyleRule::new(true, Symbol::new([255.0, 255.0, 0.0])),
    ])
    .unwrap()
}

// ============================================================================
// Core Benchmarks
// ============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(20);

    let projector = WebMercatorProjector::new(12.0);
    let style = vendor_style();

    for (trips, points) in [(1, 50_000), (100, 1_000), (5_000, 20)] {
        let input = generate_trips(trips, points);
        group.throughput(Throughput::Elements((trips * points) as u64));
        group.bench_with_input(
            BenchmarkId::new("trips_x_points", format!("{trips}x{points}")),
            &input,
            |b, input| {
                let builder = GeometryBuilder::new(&projector, &style);
                b.iter(|| builder.build(input));
            },
        );
    }

    group.finish();
}

fn bench_style_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("style");

    let style = vendor_style();
    let trip = generate_trip(2, 40.7, -74.0, 2);

    group.bench_function("resolve_fallthrough", |b| {
        b.iter(|| style.resolve_trip(&trip));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_build, bench_style_resolution);

criterion_main!(benches);
