use criterion::{criterion_group, criterion_main, Criterion};
use geojson::{FeatureCollection, GeoJson};
use shade_map::map::{Category, LayerRegistry, MapRenderer, Viewport};
use std::hint::black_box;

const CENTER: (f64, f64) = (-110.9747, 32.2226);

fn points(n: usize) -> FeatureCollection {
    let features: Vec<String> = (0..n)
        .map(|i| {
            let dx = (i % 100) as f64 * 0.001 - 0.05;
            let dy = (i / 100) as f64 * 0.001 - 0.05;
            format!(
                r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{},{}]}},"properties":{{"name":"Tree {i}"}}}}"#,
                CENTER.0 + dx,
                CENTER.1 + dy
            )
        })
        .collect();
    parse(&features)
}

fn zones(n: usize) -> FeatureCollection {
    let features: Vec<String> = (0..n)
        .map(|i| {
            let x = CENTER.0 - 0.1 + (i % 10) as f64 * 0.02;
            let y = CENTER.1 - 0.1 + (i / 10) as f64 * 0.02;
            format!(
                r#"{{"type":"Feature","geometry":{{"type":"Polygon","coordinates":[[[{x},{y}],[{},{y}],[{},{}],[{x},{}],[{x},{y}]]]}},"properties":{{}}}}"#,
                x + 0.015,
                x + 0.015,
                y + 0.015,
                y + 0.015
            )
        })
        .collect();
    parse(&features)
}

fn parse(features: &[String]) -> FeatureCollection {
    let json = format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    );
    let geojson: GeoJson = json.parse().unwrap();
    FeatureCollection::try_from(geojson).unwrap()
}

fn registry() -> LayerRegistry {
    let mut registry = LayerRegistry::new();
    registry.populate(Category::Trees, &points(10_000));
    registry.populate(Category::Structures, &points(500));
    registry.populate(Category::HeatZones, &zones(100));
    registry
}

fn bench_render(c: &mut Criterion) {
    let registry = registry();
    let renderer = MapRenderer::new();
    let (width, height) = (200, 60);

    let mut group = c.benchmark_group("render");
    for zoom in [11.0, 14.0, 17.0] {
        let viewport = Viewport::new(CENTER.0, CENTER.1, zoom, width * 2, height * 4);
        group.bench_function(format!("z{zoom}"), |b| {
            b.iter(|| {
                renderer.render(
                    black_box(width),
                    black_box(height),
                    &viewport,
                    &registry,
                    Some(CENTER),
                )
            })
        });
    }
    group.finish();
}

fn bench_hit_test(c: &mut Criterion) {
    let registry = registry();
    let viewport = Viewport::new(CENTER.0, CENTER.1, 14.0, 400, 240);
    c.bench_function("hit_test", |b| {
        b.iter(|| registry.hit_test(&viewport, black_box(200), black_box(120)))
    });
}

criterion_group!(benches, bench_render, bench_hit_test);
criterion_main!(benches);
