use crate::color::Rgb;

const BRAILLE_BLANK: u32 = 0x2800;

/// Bit of each dot in a braille cell, indexed `[x][y]`:
/// ```text
/// 0x01 0x08
/// 0x02 0x10
/// 0x04 0x20
/// 0x40 0x80
/// ```
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots) plus an optional
/// cell fill colour used for choropleth regions.
/// Unicode Braille patterns: U+2800 to U+28FF
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    pixels: Vec<u8>,
    fills: Vec<Option<Rgb>>,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width * height],
            fills: vec![None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Set one braille dot. `x` runs over `width * 2` columns and `y` over
    /// `height * 4` rows.
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let (col, row) = (x / 2, y / 4);
        if col >= self.width || row >= self.height {
            return;
        }
        self.pixels[row * self.width + col] |= DOT_BITS[x % 2][y % 4];
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Paint a whole character cell
    pub fn fill_cell(&mut self, col: usize, row: usize, color: Rgb) {
        if col < self.width && row < self.height {
            self.fills[row * self.width + col] = Some(color);
        }
    }

    pub fn fill_at(&self, col: usize, row: usize) -> Option<Rgb> {
        if col < self.width && row < self.height {
            self.fills[row * self.width + col]
        } else {
            None
        }
    }

    /// Braille glyph of a cell, `None` when no dot is set
    pub fn glyph_at(&self, col: usize, row: usize) -> Option<char> {
        if col >= self.width || row >= self.height {
            return None;
        }
        match self.pixels[row * self.width + col] {
            0 => None,
            bits => char::from_u32(BRAILLE_BLANK + bits as u32),
        }
    }

    /// Get a specific row as a string (for line-by-line rendering)
    pub fn row_to_string(&self, row: usize) -> String {
        if row >= self.height {
            return String::new();
        }
        self.pixels[row * self.width..(row + 1) * self.width]
            .iter()
            .map(|&b| char::from_u32(BRAILLE_BLANK + b as u32).unwrap_or(' '))
            .collect()
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height)
            .map(|row| self.row_to_string(row))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
