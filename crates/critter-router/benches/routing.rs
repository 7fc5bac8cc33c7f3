//! Route resolution benchmarks.
//!
//! Run with: `cargo bench -p critter-router`

use critter_router::Registry;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;

fn build_registry(num_routes: usize) -> Registry<usize> {
    let mut registry = Registry::new();

    for i in 0..num_routes / 2 {
        registry
            .add(Method::GET, format!("/api/v1/resource{i}"), i)
            .unwrap();
    }

    for i in 0..num_routes / 2 {
        registry
            .add(Method::GET, format!("/api/v1/resource{i}/([0-9]+)"), i)
            .unwrap();
    }

    registry.add(Method::GET, "/static(/.*)", usize::MAX).unwrap();
    registry
}

fn bench_first_route(c: &mut Criterion) {
    let registry = build_registry(100);

    c.bench_function("first_route", |b| {
        b.iter(|| black_box(registry.resolve(&Method::GET, "/api/v1/resource0")));
    });
}

fn bench_capture_route(c: &mut Criterion) {
    let registry = build_registry(100);

    c.bench_function("capture_route", |b| {
        b.iter(|| black_box(registry.resolve(&Method::GET, "/api/v1/resource25/12345")));
    });
}

fn bench_wildcard_tail(c: &mut Criterion) {
    let registry = build_registry(100);

    c.bench_function("wildcard_tail", |b| {
        b.iter(|| black_box(registry.resolve(&Method::GET, "/static/css/site.css")));
    });
}

fn bench_miss(c: &mut Criterion) {
    let registry = build_registry(100);

    c.bench_function("miss", |b| {
        b.iter(|| black_box(registry.resolve(&Method::GET, "/api/v1/nonexistent/path")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for num_routes in [10, 50, 100, 500] {
        let registry = build_registry(num_routes);

        group.bench_with_input(
            BenchmarkId::new("last_capture_route", num_routes),
            &num_routes,
            |b, &n| {
                let path = format!("/api/v1/resource{}/1", n / 2 - 1);
                b.iter(|| black_box(registry.resolve(&Method::GET, &path)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_first_route,
    bench_capture_route,
    bench_wildcard_tail,
    bench_miss,
    bench_scaling
);
criterion_main!(benches);
