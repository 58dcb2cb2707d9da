use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 8-bit RGB colour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const WHITE: Rgb = Rgb::new(255, 255, 255);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid colour {0:?}, expected #RRGGBB")]
pub struct ParseColorError(String);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation in RGB space, each channel rounded on its own.
    /// `t` is not clamped.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        #[inline(always)]
        fn channel(a: u8, b: u8, t: f64) -> u8 {
            (a as f64 + (b as f64 - a as f64) * t).round() as u8
        }
        Rgb {
            r: channel(self.r, other.r, t),
            g: channel(self.g, other.g, t),
            b: channel(self.b, other.b, t),
        }
    }

    /// Colour from hue (degrees), saturation and lightness in [0, 1]
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Rgb {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        let to_u8 = |v: f64| ((v + m) * 255.0).round() as u8;
        Rgb::new(to_u8(r), to_u8(g), to_u8(b))
    }

    /// Perceived brightness, used to pick readable text on a swatch
    pub fn is_light(self) -> bool {
        let luma = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
        luma > 150.0
    }
}

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Rgb::new(byte(0)?, byte(2)?, byte(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
