//! Styling of backend map responses: fill colours, popups and legends.

use crate::api::Resource;
use crate::color::{Rgb, WHITE};
use crate::data::{CountryFeature, FeatureValue};
use crate::map::palette;
use crate::map::spatial::{BoundingBox, FeatureGrid};
use crate::map::geometry::polygon_contains;
use crate::state::{Mode, ResourceType};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

/// Grid cell size in degrees for hit-testing
const GRID_CELL_DEG: f64 = 10.0;

/// Breakpoints shown in the popularity legend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendScale {
    #[default]
    Fine,
    Quartiles,
}

impl LegendScale {
    pub fn breakpoints(self) -> &'static [f64] {
        match self {
            LegendScale::Fine => &[0.0, 0.05, 0.1, 0.2, 0.5, 0.75, 1.0],
            LegendScale::Quartiles => &[0.0, 0.25, 0.5, 0.75, 1.0],
        }
    }
}

/// Popularity as shown to the user: plain when it has at most four decimals,
/// otherwise rounded to exactly four.
pub fn format_popularity(popularity: f64) -> String {
    let scaled = popularity * 10000.0;
    if scaled.floor() != scaled {
        format!("{:.4}", popularity)
    } else {
        popularity.to_string()
    }
}

/// Fill colour of a popularity value: white at 0, `accent` at 1
pub fn popularity_color(popularity: f64, accent: Rgb) -> Rgb {
    WHITE.lerp(accent, popularity)
}

/// Text shown when a country is inspected
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
    /// Number of countries won, for categorical legends
    pub count: Option<usize>,
}

/// Explanation of the colour encoding on the map
#[derive(Clone, Debug, PartialEq)]
pub enum Legend {
    Gradient {
        title: String,
        entries: Vec<LegendEntry>,
        low_label: &'static str,
        high_label: &'static str,
    },
    Categorical {
        title: String,
        entries: Vec<LegendEntry>,
    },
}

impl Legend {
    pub fn title(&self) -> &str {
        match self {
            Legend::Gradient { title, .. } | Legend::Categorical { title, .. } => title,
        }
    }

    pub fn entries(&self) -> &[LegendEntry] {
        match self {
            Legend::Gradient { entries, .. } | Legend::Categorical { entries, .. } => entries,
        }
    }
}

/// A country with its fill and popup bound
#[derive(Clone, Debug)]
pub struct StyledFeature {
    pub feature: CountryFeature,
    pub fill: Rgb,
    pub popup: Popup,
    pub bbox: Option<BoundingBox>,
}

/// The single data layer drawn over the base map
pub struct ChoroplethLayer {
    pub mode: Mode,
    pub resource_type: ResourceType,
    features: Vec<StyledFeature>,
    grid: FeatureGrid,
}

impl ChoroplethLayer {
    fn new(mode: Mode, resource_type: ResourceType, features: Vec<StyledFeature>) -> Self {
        let grid = FeatureGrid::build(features.iter().map(|f| f.bbox.as_ref()), GRID_CELL_DEG);
        Self {
            mode,
            resource_type,
            features,
            grid,
        }
    }

    /// Style a popularity response. `resource_label` names the selected
    /// resource in every popup.
    pub fn popularity(
        features: Vec<CountryFeature>,
        resource_type: ResourceType,
        resource_label: &str,
        accent: Rgb,
        scale: LegendScale,
    ) -> (Self, Legend) {
        let styled = features
            .into_par_iter()
            .map(|feature| {
                let popularity = match feature.value {
                    FeatureValue::Popularity(p) => p,
                    FeatureValue::Winner(_) => 0.0,
                };
                let popup = Popup {
                    title: country_title(&feature),
                    lines: vec![
                        resource_label.to_string(),
                        format!("Popularity: {}", format_popularity(popularity)),
                    ],
                    link: None,
                };
                StyledFeature {
                    fill: popularity_color(popularity, accent),
                    bbox: BoundingBox::of_polygons(&feature.polygons),
                    popup,
                    feature,
                }
            })
            .collect();

        let entries = scale
            .breakpoints()
            .iter()
            .map(|&p| LegendEntry {
                label: format_popularity(p),
                color: popularity_color(p, accent),
                count: None,
            })
            .collect();

        let legend = Legend::Gradient {
            title: format!("{} popularity", resource_label),
            entries,
            low_label: "least popular",
            high_label: "most popular",
        };

        (Self::new(Mode::Popularity, resource_type, styled), legend)
    }

    /// Style a trends response: one colour per winning resource, ranked by
    /// the number of countries it wins.
    pub fn trends(features: Vec<CountryFeature>, resource_type: ResourceType) -> (Self, Legend) {
        let ranking = rank_winners(features.iter().filter_map(|f| winner(f).map(|r| r.name.as_str())));
        let colors = palette::categorical(ranking.len());
        let color_of: HashMap<&str, Rgb> = ranking
            .iter()
            .zip(colors.iter())
            .map(|((name, _), color)| (name.as_str(), *color))
            .collect();

        let styled = features
            .into_par_iter()
            .map(|feature| {
                let fill = winner(&feature)
                    .and_then(|r| color_of.get(r.name.as_str()).copied())
                    .unwrap_or(WHITE);
                StyledFeature {
                    fill,
                    bbox: BoundingBox::of_polygons(&feature.polygons),
                    popup: trend_popup(&feature, resource_type),
                    feature,
                }
            })
            .collect();

        let entries = ranking
            .iter()
            .zip(colors)
            .map(|((name, count), color)| LegendEntry {
                label: name.clone(),
                color,
                count: Some(*count),
            })
            .collect();

        let legend = Legend::Categorical {
            title: format!("Top {} per country", resource_type),
            entries,
        };

        (Self::new(Mode::Trends, resource_type, styled), legend)
    }

    pub fn features(&self) -> &[StyledFeature] {
        &self.features
    }

    /// Number of bound popups, one per feature
    pub fn popup_count(&self) -> usize {
        self.features.len()
    }

    /// Feature whose geometry contains the point
    pub fn feature_at(&self, lon: f64, lat: f64) -> Option<&StyledFeature> {
        self.grid
            .query_point(lon, lat)
            .iter()
            .filter_map(|&idx| self.features.get(idx))
            .find(|f| {
                f.bbox.is_some_and(|b| b.contains(lon, lat))
                    && f.feature.polygons.iter().any(|p| polygon_contains(p, lon, lat))
            })
    }

    /// Indices of features whose bounds intersect `bounds`
    pub fn visible_features(&self, bounds: &BoundingBox) -> Vec<usize> {
        let mut hits = Vec::new();
        self.grid.query_into(bounds, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

fn winner(feature: &CountryFeature) -> Option<&Resource> {
    match &feature.value {
        FeatureValue::Winner(r) => Some(r),
        FeatureValue::Popularity(_) => None,
    }
}

fn country_title(feature: &CountryFeature) -> String {
    format!("{} ({})", feature.name, feature.alpha_2_code)
}

/// Count names and order them by frequency, most frequent first.
/// Ties keep first-seen order.
pub fn rank_winners<'a>(names: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut ranking: Vec<(String, usize)> = Vec::new();
    let mut position: HashMap<&'a str, usize> = HashMap::new();
    for name in names {
        match position.get(name) {
            Some(&idx) => ranking[idx].1 += 1,
            None => {
                position.insert(name, ranking.len());
                ranking.push((name.to_string(), 1));
            }
        }
    }
    // sort_by is stable
    ranking.sort_by(|a, b| b.1.cmp(&a.1));
    ranking
}

fn trend_popup(feature: &CountryFeature, resource_type: ResourceType) -> Popup {
    let title = country_title(feature);
    let Some(resource) = winner(feature) else {
        return Popup {
            title,
            lines: Vec::new(),
            link: None,
        };
    };

    let artists = resource.artist_names().unwrap_or_default();
    let mut lines = Vec::new();
    match resource_type {
        ResourceType::Track => {
            lines.push(format!("Track: {}", resource.name));
            if let Some(album) = &resource.album {
                lines.push(format!("Album: {}", album.name));
            }
            lines.push(format!("Artists: {}", artists));
            if let Some(preview) = &resource.preview_url {
                lines.push(format!("Preview: {}", preview));
            }
        }
        ResourceType::Album => {
            lines.push(format!("Album: {}", resource.name));
            if let Some(kind) = &resource.album_type {
                lines.push(format!("Type: {}", kind));
            }
            if let Some(total) = resource.total_tracks {
                lines.push(format!("Tracks: {}", total));
            }
            lines.push(format!("Artists: {}", artists));
        }
        ResourceType::Artist => {
            lines.push(format!("Artist: {}", resource.name));
            let genres = resource
                .genres
                .as_ref()
                .filter(|g| !g.is_empty())
                .map(|g| g.join(", "))
                .unwrap_or_else(|| "unknown".to_string());
            lines.push(format!("Genres: {}", genres));
        }
    }

    Popup {
        title,
        lines,
        link: resource.spotify_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AlbumRef, ArtistRef};

    const ACCENT: Rgb = Rgb::new(29, 185, 84);

    fn square(lon: f64, lat: f64) -> Vec<Vec<(f64, f64)>> {
        vec![vec![(lon, lat), (lon + 5.0, lat), (lon + 5.0, lat + 5.0), (lon, lat + 5.0), (lon, lat)]]
    }

    fn country(code: &str, lon: f64, value: FeatureValue) -> CountryFeature {
        CountryFeature {
            name: format!("Country {code}"),
            alpha_2_code: code.to_string(),
            polygons: vec![square(lon, 0.0)],
            value,
        }
    }

    fn artist(name: &str) -> FeatureValue {
        FeatureValue::Winner(Resource {
            id: name.to_lowercase(),
            name: name.to_string(),
            genres: Some(vec!["indie".into()]),
            spotify_url: Some(format!("https://open.spotify.com/artist/{name}")),
            ..Resource::default()
        })
    }

    #[test]
    fn test_format_popularity() {
        assert_eq!(format_popularity(0.5), "0.5");
        assert_eq!(format_popularity(0.123456), "0.1235");
        assert_eq!(format_popularity(0.0), "0");
        assert_eq!(format_popularity(1.0), "1");
        assert_eq!(format_popularity(0.25), "0.25");
    }

    #[test]
    fn test_popularity_color_endpoints() {
        assert_eq!(popularity_color(0.0, ACCENT), WHITE);
        assert_eq!(popularity_color(1.0, ACCENT), ACCENT);
    }

    #[test]
    fn test_popularity_color_monotonic() {
        let mut prev = popularity_color(0.0, ACCENT);
        for step in 1..=100 {
            let next = popularity_color(step as f64 / 100.0, ACCENT);
            assert!(next.r <= prev.r && next.g <= prev.g && next.b <= prev.b);
            prev = next;
        }
    }

    #[test]
    fn test_rank_winners_by_frequency() {
        let ranking = rank_winners(["X", "X", "Y"].into_iter());
        assert_eq!(ranking, vec![("X".to_string(), 2), ("Y".to_string(), 1)]);
    }

    #[test]
    fn test_rank_winners_ties_keep_first_seen() {
        let ranking = rank_winners(["B", "A", "C", "A", "B"].into_iter());
        let names: Vec<&str> = ranking.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_popularity_layer() {
        let features = vec![
            country("DE", 0.0, FeatureValue::Popularity(0.0)),
            country("FR", 20.0, FeatureValue::Popularity(1.0)),
        ];
        let (layer, legend) =
            ChoroplethLayer::popularity(features, ResourceType::Artist, "Band", ACCENT, LegendScale::Fine);

        assert_eq!(layer.popup_count(), 2);
        assert_eq!(layer.features()[0].fill, WHITE);
        assert_eq!(layer.features()[1].fill, ACCENT);
        assert_eq!(layer.features()[1].popup.title, "Country FR (FR)");
        assert_eq!(layer.features()[1].popup.lines, vec!["Band", "Popularity: 1"]);

        let labels: Vec<&str> = legend.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "0.05", "0.1", "0.2", "0.5", "0.75", "1"]);
        assert!(matches!(legend, Legend::Gradient { low_label: "least popular", .. }));
    }

    #[test]
    fn test_quartile_legend() {
        let (_, legend) = ChoroplethLayer::popularity(Vec::new(), ResourceType::Track, "Song", ACCENT, LegendScale::Quartiles);
        assert_eq!(legend.entries().len(), 5);
        assert_eq!(legend.entries()[4].color, ACCENT);
    }

    #[test]
    fn test_trends_layer_colors_and_legend() {
        let features = vec![
            country("DE", 0.0, artist("X")),
            country("FR", 20.0, artist("X")),
            country("IT", 40.0, artist("Y")),
        ];
        let (layer, legend) = ChoroplethLayer::trends(features, ResourceType::Artist);

        let entries = legend.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "X");
        assert_eq!(entries[0].count, Some(2));
        assert_eq!(entries[1].label, "Y");
        assert_ne!(entries[0].color, entries[1].color);

        let fills: Vec<Rgb> = layer.features().iter().map(|f| f.fill).collect();
        assert_eq!(fills, vec![entries[0].color, entries[0].color, entries[1].color]);

        let popup = &layer.features()[2].popup;
        assert_eq!(popup.lines, vec!["Artist: Y", "Genres: indie"]);
        assert_eq!(popup.link.as_deref(), Some("https://open.spotify.com/artist/Y"));
    }

    #[test]
    fn test_track_popup_details() {
        let track = Resource {
            id: "t".into(),
            name: "Song".into(),
            preview_url: Some("https://p.scdn.co/t".into()),
            album: Some(AlbumRef {
                name: "Record".into(),
                ..AlbumRef::default()
            }),
            artists: Some(vec![ArtistRef {
                id: None,
                name: "A".into(),
            }]),
            ..Resource::default()
        };
        let feature = country("SE", 0.0, FeatureValue::Winner(track));
        let popup = trend_popup(&feature, ResourceType::Track);
        assert_eq!(
            popup.lines,
            vec!["Track: Song", "Album: Record", "Artists: A", "Preview: https://p.scdn.co/t"]
        );
    }

    #[test]
    fn test_album_popup_details() {
        let album = Resource {
            id: "al".into(),
            name: "Record".into(),
            album_type: Some("single".into()),
            total_tracks: Some(3),
            artists: Some(vec![ArtistRef {
                id: None,
                name: "A".into(),
            }]),
            ..Resource::default()
        };
        let feature = country("NO", 0.0, FeatureValue::Winner(album));
        let popup = trend_popup(&feature, ResourceType::Album);
        assert_eq!(popup.lines, vec!["Album: Record", "Type: single", "Tracks: 3", "Artists: A"]);
    }

    #[test]
    fn test_feature_at() {
        let features = vec![
            country("DE", 0.0, FeatureValue::Popularity(0.1)),
            country("FR", 20.0, FeatureValue::Popularity(0.2)),
        ];
        let (layer, _) = ChoroplethLayer::popularity(features, ResourceType::Artist, "Band", ACCENT, LegendScale::Fine);
        assert_eq!(layer.feature_at(22.0, 2.0).map(|f| f.feature.alpha_2_code.as_str()), Some("FR"));
        assert!(layer.feature_at(12.0, 2.0).is_none());
    }
}
