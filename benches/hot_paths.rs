use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trendmap::api::Resource;
use trendmap::braille::BrailleCanvas;
use trendmap::color::Rgb;
use trendmap::data::{CountryFeature, FeatureValue};
use trendmap::map::{fill_polygon, ChoroplethLayer, MapRenderer, Viewport};
use trendmap::state::ResourceType;

/// Jagged ring roughly the size of a large country on a 200x60 canvas
fn screen_ring() -> Vec<(f64, f64)> {
    (0..=360)
        .map(|deg| {
            let t = (deg as f64).to_radians();
            let r = 100.0 + 20.0 * (t * 7.0).sin();
            (200.0 + r * t.cos(), 120.0 + r * t.sin())
        })
        .collect()
}

/// 200 square countries won by 40 distinct artists
fn trend_features() -> Vec<CountryFeature> {
    (0..200)
        .map(|i| {
            let lon = -180.0 + (i % 20) as f64 * 18.0;
            let lat = -60.0 + (i / 20) as f64 * 12.0;
            CountryFeature {
                name: format!("Country {}", i),
                alpha_2_code: format!("{:02}", i % 100),
                polygons: vec![vec![vec![
                    (lon, lat),
                    (lon + 15.0, lat),
                    (lon + 15.0, lat + 10.0),
                    (lon, lat + 10.0),
                    (lon, lat),
                ]]],
                value: FeatureValue::Winner(Resource {
                    id: format!("a{}", i % 40),
                    name: format!("Artist {}", i % 40),
                    ..Resource::default()
                }),
            }
        })
        .collect()
}

fn bench_fill_polygon(c: &mut Criterion) {
    let rings = vec![screen_ring()];
    let color = Rgb::new(29, 185, 84);
    c.bench_function("fill_polygon", |b| {
        b.iter(|| {
            let mut canvas = BrailleCanvas::new(200, 60);
            fill_polygon(&mut canvas, black_box(&rings), color);
            canvas
        })
    });
}

fn bench_trends_styling(c: &mut Criterion) {
    let features = trend_features();
    c.bench_function("trends_styling", |b| {
        b.iter(|| ChoroplethLayer::trends(black_box(features.clone()), ResourceType::Artist))
    });
}

fn bench_render_layer(c: &mut Criterion) {
    let mut renderer = MapRenderer::new();
    let (layer, legend) = ChoroplethLayer::trends(trend_features(), ResourceType::Artist);
    renderer.show(layer, legend);
    let viewport = Viewport::new(0.0, 20.0, 1.0, 400, 240);
    c.bench_function("render_layer", |b| {
        b.iter(|| renderer.render(200, 60, black_box(&viewport)))
    });
}

criterion_group!(benches, bench_fill_polygon, bench_trends_styling, bench_render_layer);
criterion_main!(benches);
