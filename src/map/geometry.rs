use crate::braille::BrailleCanvas;
use crate::color::Rgb;
use crate::data::Polygon;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Fill a projected polygon at character-cell resolution.
///
/// `rings` are in braille pixel coordinates; holes are honoured with the
/// even-odd rule. A cell is filled when its centre lies inside.
pub fn fill_polygon(canvas: &mut BrailleCanvas, rings: &[Vec<(f64, f64)>], color: Rgb) {
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if !min_y.is_finite() {
        return;
    }

    let rows = canvas.height() as i64;
    let first_row = ((min_y - 2.0) / 4.0).ceil().max(0.0) as i64;
    let last_row = (((max_y - 2.0) / 4.0).floor() as i64).min(rows - 1);

    let mut crossings: Vec<f64> = Vec::new();
    for row in first_row..=last_row {
        let y = row as f64 * 4.0 + 2.0;

        crossings.clear();
        for ring in rings {
            for edge in ring.windows(2) {
                let ((x0, y0), (x1, y1)) = (edge[0], edge[1]);
                if (y0 <= y) != (y1 <= y) {
                    crossings.push(x0 + (y - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            fill_span(canvas, row as usize, span[0], span[1], color);
        }
    }
}

fn fill_span(canvas: &mut BrailleCanvas, row: usize, x_start: f64, x_end: f64, color: Rgb) {
    // Cell centre sits at pixel x = col * 2 + 1
    let first = ((x_start - 1.0) / 2.0).ceil().max(0.0);
    let end = ((x_end - 1.0) / 2.0).ceil().min(canvas.width() as f64);
    if end <= first {
        return;
    }
    for col in first as usize..end as usize {
        canvas.fill_cell(col, row, color);
    }
}

/// Even-odd test of a geographic point against a polygon with holes
pub fn polygon_contains(polygon: &Polygon, lon: f64, lat: f64) -> bool {
    let mut inside = false;
    for ring in polygon {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}
