use crate::braille::BrailleCanvas;
use crate::color::Rgb;
use crate::data::Ring;
use crate::map::choropleth::{ChoroplethLayer, Legend};
use crate::map::geometry::{draw_line, fill_polygon};
use crate::map::projection::Viewport;
use rayon::prelude::*;

/// Level of detail for base map data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }
}

/// Rasterized map, drawn back to front by the UI
pub struct MapLayers {
    /// Base world outline
    pub base: BrailleCanvas,
    /// Country fills and their outlines
    pub overlay: BrailleCanvas,
}

/// Owns the base layer, the data layer and its legend.
///
/// At most one data layer and one legend exist at a time; `clear_overlays`
/// removes both and leaves the base layer untouched.
pub struct MapRenderer {
    coastlines_low: Vec<Ring>,
    coastlines_medium: Vec<Ring>,
    coastlines_high: Vec<Ring>,
    layer: Option<ChoroplethLayer>,
    legend: Option<Legend>,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_medium: Vec::new(),
            coastlines_high: Vec::new(),
            layer: None,
            legend: None,
        }
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: Ring, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    /// Check if any base data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }

    /// Remove the data layer and legend
    pub fn clear_overlays(&mut self) {
        self.layer = None;
        self.legend = None;
    }

    /// Replace the data layer and legend
    pub fn show(&mut self, layer: ChoroplethLayer, legend: Legend) {
        self.layer = Some(layer);
        self.legend = Some(legend);
    }

    pub fn layer(&self) -> Option<&ChoroplethLayer> {
        self.layer.as_ref()
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    /// Get coastlines for the given LOD, falling back to coarser data
    fn get_coastlines(&self, lod: Lod) -> &[Ring] {
        let candidates = match lod {
            Lod::High => [&self.coastlines_high, &self.coastlines_medium, &self.coastlines_low],
            Lod::Medium => [&self.coastlines_medium, &self.coastlines_low, &self.coastlines_low],
            Lod::Low => [&self.coastlines_low, &self.coastlines_medium, &self.coastlines_high],
        };
        candidates
            .into_iter()
            .find(|lines| !lines.is_empty())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rasterize every layer for a `width` x `height` cell area
    pub fn render(&self, width: usize, height: usize, viewport: &Viewport) -> MapLayers {
        let mut base = BrailleCanvas::new(width, height);
        for line in self.get_coastlines(Lod::from_zoom(viewport.zoom)) {
            draw_linestring(&mut base, line, viewport);
        }

        let mut overlay = BrailleCanvas::new(width, height);
        if let Some(layer) = &self.layer {
            draw_layer(&mut overlay, layer, viewport);
        }

        MapLayers { base, overlay }
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Polygon rings in braille pixel coordinates
type ScreenPolygon = Vec<Vec<(f64, f64)>>;

/// Project, fill and outline the visible features of a layer
fn draw_layer(canvas: &mut BrailleCanvas, layer: &ChoroplethLayer, viewport: &Viewport) {
    let visible = layer.visible_features(&viewport.visible_bounds());
    let max_jump = viewport.width as f64 / 2.0;

    let projected: Vec<(Rgb, Vec<ScreenPolygon>)> = visible
        .par_iter()
        .filter_map(|&idx| layer.features().get(idx))
        .map(|styled| {
            let polygons: Vec<ScreenPolygon> = styled
                .feature
                .polygons
                .iter()
                .map(|polygon| {
                    polygon
                        .iter()
                        .map(|ring| ring.iter().map(|&(lon, lat)| viewport.project_f(lon, lat)).collect())
                        .collect()
                })
                .collect();
            (styled.fill, polygons)
        })
        .collect();

    for (fill, polygons) in &projected {
        for rings in polygons {
            // Rings split across the antimeridian would smear over the whole row
            let wraps = rings
                .iter()
                .any(|ring: &Vec<(f64, f64)>| ring.windows(2).any(|e| (e[1].0 - e[0].0).abs() > max_jump));
            if !wraps {
                fill_polygon(canvas, rings, *fill);
            }
        }
    }

    for (_, polygons) in &projected {
        for ring in polygons.iter().flatten() {
            for edge in ring.windows(2) {
                if !(edge[0].0.is_finite() && edge[0].1.is_finite() && edge[1].0.is_finite() && edge[1].1.is_finite())
                {
                    continue;
                }
                let (x0, y0) = (edge[0].0 as i32, edge[0].1 as i32);
                let (x1, y1) = (edge[1].0 as i32, edge[1].1 as i32);
                if (edge[1].0 - edge[0].0).abs() < max_jump && viewport.line_might_be_visible((x0, y0), (x1, y1)) {
                    draw_line(canvas, x0, y0, x1, y1);
                }
            }
        }
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &Ring, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);

        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountryFeature, FeatureValue};
    use crate::map::choropleth::LegendScale;
    use crate::state::ResourceType;

    fn layer_with_square() -> (ChoroplethLayer, Legend) {
        let feature = CountryFeature {
            name: "Square".into(),
            alpha_2_code: "SQ".into(),
            polygons: vec![vec![vec![(-20.0, -20.0), (20.0, -20.0), (20.0, 20.0), (-20.0, 20.0), (-20.0, -20.0)]]],
            value: FeatureValue::Popularity(1.0),
        };
        ChoroplethLayer::popularity(vec![feature], ResourceType::Artist, "Band", Rgb::new(0, 0, 0), LegendScale::Fine)
    }

    #[test]
    fn test_lod_from_zoom() {
        assert_eq!(Lod::from_zoom(1.0), Lod::Low);
        assert_eq!(Lod::from_zoom(4.0), Lod::Medium);
        assert_eq!(Lod::from_zoom(9.0), Lod::High);
    }

    #[test]
    fn test_coastline_fallback() {
        let mut renderer = MapRenderer::new();
        renderer.add_coastline(vec![(0.0, 0.0), (1.0, 1.0)], Lod::Low);
        assert_eq!(renderer.get_coastlines(Lod::High).len(), 1);
        assert_eq!(renderer.get_coastlines(Lod::Medium).len(), 1);
    }

    #[test]
    fn test_show_and_clear_overlays() {
        let mut renderer = MapRenderer::new();
        let (layer, legend) = layer_with_square();
        renderer.show(layer, legend);
        assert!(renderer.layer().is_some());
        assert!(renderer.legend().is_some());

        renderer.clear_overlays();
        assert!(renderer.layer().is_none());
        assert!(renderer.legend().is_none());
    }

    #[test]
    fn test_render_feature_touching_pole() {
        let feature = CountryFeature {
            name: "Antarctica".into(),
            alpha_2_code: "AQ".into(),
            polygons: vec![vec![vec![(-60.0, -70.0), (60.0, -70.0), (60.0, -90.0), (-60.0, -90.0), (-60.0, -70.0)]]],
            value: FeatureValue::Popularity(0.5),
        };
        let accent = Rgb::new(0, 0, 0);
        let (layer, legend) =
            ChoroplethLayer::popularity(vec![feature], ResourceType::Artist, "Band", accent, LegendScale::Fine);
        let mut renderer = MapRenderer::new();
        renderer.show(layer, legend);

        let viewport = Viewport::new(0.0, -80.0, 1.0, 160, 80);
        let layers = renderer.render(80, 20, &viewport);
        let filled = (0..20).any(|row| (0..80).any(|col| layers.overlay.fill_at(col, row).is_some()));
        assert!(filled);
    }

    #[test]
    fn test_render_fills_center_of_feature() {
        let mut renderer = MapRenderer::new();
        let (layer, legend) = layer_with_square();
        renderer.show(layer, legend);

        let viewport = Viewport::new(0.0, 0.0, 1.0, 80, 80);
        let layers = renderer.render(40, 20, &viewport);
        assert_eq!(layers.overlay.fill_at(20, 10), Some(Rgb::new(0, 0, 0)));
        assert_eq!(layers.overlay.fill_at(0, 0), None);
    }
}
