use crate::data::Polygon;
use std::collections::HashMap;

/// Axis-aligned lon/lat bounds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Bounds of every ring of every polygon, `None` for empty geometry
    pub fn of_polygons(polygons: &[Polygon]) -> Option<Self> {
        let mut points = polygons.iter().flatten().flatten();
        let &(lon, lat) = points.next()?;
        let init = BoundingBox {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        };
        Some(points.fold(init, |b, &(lon, lat)| BoundingBox {
            min_lon: b.min_lon.min(lon),
            min_lat: b.min_lat.min(lat),
            max_lon: b.max_lon.max(lon),
            max_lat: b.max_lat.max(lat),
        }))
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// Spatial index for country features using conservative approximation.
/// Each feature's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the caller's exact polygon test).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from per-feature bounds; features without geometry are skipped
    /// but keep their index position.
    pub fn build<'a>(bboxes: impl Iterator<Item = Option<&'a BoundingBox>>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, bbox) in bboxes.enumerate() {
            let Some(bbox) = bbox else { continue };
            let min_cell = grid.to_cell(bbox.min_lon, bbox.min_lat);
            let max_cell = grid.to_cell(bbox.max_lon, bbox.max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Candidate features whose bounds may contain the point
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append feature indices for the given bounds into results vec.
    /// May contain duplicates; caller should dedup after all queries.
    pub fn query_into(&self, bounds: &BoundingBox, results: &mut Vec<usize>) {
        let min_cell = self.to_cell(bounds.min_lon, bounds.min_lat);
        let max_cell = self.to_cell(bounds.max_lon, bounds.max_lat);
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lon: f64, lat: f64, size: f64) -> Polygon {
        vec![vec![
            (lon, lat),
            (lon + size, lat),
            (lon + size, lat + size),
            (lon, lat + size),
            (lon, lat),
        ]]
    }

    #[test]
    fn test_bbox_of_polygons() {
        let bbox = BoundingBox::of_polygons(&[square(0.0, 0.0, 5.0), square(-10.0, 20.0, 1.0)]).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                min_lon: -10.0,
                min_lat: 0.0,
                max_lon: 5.0,
                max_lat: 21.0
            }
        );
        assert!(BoundingBox::of_polygons(&[]).is_none());
    }

    #[test]
    fn test_query_point_finds_overlapping_features() {
        let a = BoundingBox::of_polygons(&[square(0.0, 0.0, 20.0)]);
        let b = BoundingBox::of_polygons(&[square(50.0, 50.0, 5.0)]);
        let grid = FeatureGrid::build([a.as_ref(), None, b.as_ref()].into_iter(), 10.0);

        assert_eq!(grid.query_point(15.0, 15.0), &[0]);
        assert_eq!(grid.query_point(52.0, 51.0), &[2]);
        assert!(grid.query_point(-40.0, 0.0).is_empty());
    }

    #[test]
    fn test_query_into_bounds() {
        let a = BoundingBox::of_polygons(&[square(0.0, 0.0, 5.0)]);
        let b = BoundingBox::of_polygons(&[square(100.0, 0.0, 5.0)]);
        let grid = FeatureGrid::build([a.as_ref(), b.as_ref()].into_iter(), 10.0);

        let mut hits = Vec::new();
        let view = BoundingBox {
            min_lon: -20.0,
            min_lat: -20.0,
            max_lon: 20.0,
            max_lat: 20.0,
        };
        grid.query_into(&view, &mut hits);
        assert_eq!(hits, vec![0]);
    }
}
