use crate::api::Resource;
use crate::map::{Lod, MapRenderer};
use crate::state::{Mode, ResourceType};
use anyhow::Result;
use geojson::{GeoJson, Geometry, JsonObject, Value};
use std::fs;
use std::ops::Index;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// A closed ring of (lon, lat) coordinates
pub type Ring = Vec<(f64, f64)>;

/// Exterior ring followed by holes
pub type Polygon = Vec<Ring>;

/// What the backend says about one country
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureValue {
    Popularity(f64),
    Winner(Resource),
}

/// One country of a map response
#[derive(Clone, Debug, PartialEq)]
pub struct CountryFeature {
    pub name: String,
    pub alpha_2_code: String,
    pub polygons: Vec<Polygon>,
    pub value: FeatureValue,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("map response is not a FeatureCollection")]
    NotACollection,
    #[error("feature {index} has no properties")]
    MissingProperties { index: usize },
    #[error("feature {index} has no {key:?} property")]
    MissingProperty { index: usize, key: String },
    #[error("feature {index} has an invalid {key:?} property: {message}")]
    InvalidProperty { index: usize, key: String, message: String },
}

/// Decode a map response into country features.
///
/// Popularity maps carry `properties.popularity`; trend maps carry the winning
/// resource under `properties.<resource type>`. Missing properties are a
/// backend contract violation and fail the whole response.
pub fn decode_features(
    geojson: GeoJson,
    mode: Mode,
    resource_type: ResourceType,
) -> Result<Vec<CountryFeature>, FeatureError> {
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(FeatureError::NotACollection);
    };

    fc.features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let props = feature
                .properties
                .ok_or(FeatureError::MissingProperties { index })?;

            let name = string_property(&props, index, "name")?;
            let alpha_2_code = string_property(&props, index, "alpha_2_code")?;

            let value = match mode {
                Mode::Popularity => {
                    let popularity = props
                        .get("popularity")
                        .ok_or_else(|| missing(index, "popularity"))?
                        .as_f64()
                        .ok_or_else(|| FeatureError::InvalidProperty {
                            index,
                            key: "popularity".into(),
                            message: "not a number".into(),
                        })?;
                    FeatureValue::Popularity(popularity)
                }
                Mode::Trends => {
                    let key = resource_type.as_str();
                    let raw = props.get(key).cloned().ok_or_else(|| missing(index, key))?;
                    let resource: Resource =
                        serde_json::from_value(raw).map_err(|e| FeatureError::InvalidProperty {
                            index,
                            key: key.into(),
                            message: e.to_string(),
                        })?;
                    FeatureValue::Winner(resource)
                }
            };

            let mut polygons = Vec::new();
            if let Some(ref geometry) = feature.geometry {
                collect_polygons(geometry, &mut polygons);
            }

            Ok(CountryFeature {
                name,
                alpha_2_code,
                polygons,
                value,
            })
        })
        .collect()
}

fn missing(index: usize, key: &str) -> FeatureError {
    FeatureError::MissingProperty {
        index,
        key: key.to_string(),
    }
}

fn string_property(props: &JsonObject, index: usize, key: &str) -> Result<String, FeatureError> {
    props
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| missing(index, key))
}

fn to_ring<P: Index<usize, Output = f64>>(coords: &[P]) -> Ring {
    coords.iter().map(|c| (c[0], c[1])).collect()
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    match &geometry.value {
        Value::Polygon(rings) => {
            out.push(rings.iter().map(|r| to_ring(r)).collect());
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.push(rings.iter().map(|r| to_ring(r)).collect());
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// Load the base world outline from Natural Earth GeoJSON files in `data_dir`
pub fn load_base_layer(renderer: &mut MapRenderer, data_dir: &Path) -> Result<()> {
    let coastline_files = [
        ("ne_110m_coastline.json", Lod::Low),
        ("ne_50m_coastline.json", Lod::Medium),
        ("ne_10m_coastline.json", Lod::High),
    ];

    for (filename, lod) in coastline_files {
        let path = data_dir.join(filename);
        if path.exists() {
            match load_lines(&path) {
                Ok(lines) => {
                    info!("Loaded {} coastline segments from {}", lines.len(), filename);
                    for line in lines {
                        renderer.add_coastline(line, lod);
                    }
                }
                Err(e) => warn!("Failed to load {}: {}", filename, e),
            }
        }
    }

    Ok(())
}

fn load_lines(path: &Path) -> Result<Vec<Ring>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(Ring),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(Ring),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_ring(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_ring(coords));
            }
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_ring(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_ring(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Coarse continent outlines for when no data files are available
pub fn generate_simple_world(renderer: &mut MapRenderer) {
    const OUTLINES: [&[(f64, f64)]; 6] = [
        // North America
        &[
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        &[
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (35.0, -5.0), (35.0, -20.0), (30.0, -30.0), (20.0, -35.0),
            (18.0, -35.0), (15.0, -30.0), (10.0, -15.0), (10.0, 0.0),
            (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0), (-17.0, 15.0),
        ],
        // Asia
        &[
            (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
            (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
            (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
            (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
            (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
            (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
            (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
            (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
            (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
        ],
        // Australia
        &[
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
        ],
    ];

    for outline in OUTLINES {
        renderer.add_coastline(outline.to_vec(), Lod::Low);
    }
}
