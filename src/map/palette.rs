use crate::color::Rgb;

/// Diverging 11-class palette used when few names compete
const SMALL_PALETTE: [Rgb; 11] = [
    Rgb::new(0x9e, 0x01, 0x42),
    Rgb::new(0xd5, 0x3e, 0x4f),
    Rgb::new(0xf4, 0x6d, 0x43),
    Rgb::new(0xfd, 0xae, 0x61),
    Rgb::new(0xfe, 0xe0, 0x8b),
    Rgb::new(0xff, 0xff, 0xbf),
    Rgb::new(0xe6, 0xf5, 0x98),
    Rgb::new(0xab, 0xdd, 0xa4),
    Rgb::new(0x66, 0xc2, 0xa5),
    Rgb::new(0x32, 0x88, 0xbd),
    Rgb::new(0x5e, 0x4f, 0xa2),
];

/// Size of the generated palette for crowded legends
pub const LARGE_PALETTE_SIZE: usize = 65;

const GOLDEN_ANGLE: f64 = 137.507_764_050_037_85;

/// Colours for `count` categories.
///
/// Up to 11 categories are spread evenly over the small palette. Larger counts
/// draw from a 65-colour golden-angle palette and wrap past 65.
pub fn categorical(count: usize) -> Vec<Rgb> {
    match count {
        0 => Vec::new(),
        1 => vec![SMALL_PALETTE[0]],
        n if n <= SMALL_PALETTE.len() => {
            let last = SMALL_PALETTE.len() - 1;
            (0..n)
                .map(|i| SMALL_PALETTE[(i * last + (n - 1) / 2) / (n - 1)])
                .collect()
        }
        n => {
            let large = large_palette();
            (0..n).map(|i| large[i % LARGE_PALETTE_SIZE]).collect()
        }
    }
}

fn large_palette() -> Vec<Rgb> {
    const LIGHTNESS: [f64; 3] = [0.45, 0.6, 0.75];
    (0..LARGE_PALETTE_SIZE)
        .map(|i| {
            let hue = i as f64 * GOLDEN_ANGLE;
            Rgb::from_hsl(hue, 0.7, LIGHTNESS[i % LIGHTNESS.len()])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_small_counts_are_distinct() {
        for n in 1..=11 {
            let colors = categorical(n);
            assert_eq!(colors.len(), n);
            let unique: HashSet<_> = colors.iter().collect();
            assert_eq!(unique.len(), n, "duplicate colour for n={n}");
        }
    }

    #[test]
    fn test_small_palette_spans_both_ends() {
        let colors = categorical(2);
        assert_eq!(colors, vec![SMALL_PALETTE[0], SMALL_PALETTE[10]]);
    }

    #[test]
    fn test_large_palette_distinct_up_to_65() {
        let colors = categorical(LARGE_PALETTE_SIZE);
        let unique: HashSet<_> = colors.iter().collect();
        assert_eq!(unique.len(), LARGE_PALETTE_SIZE);
    }

    #[test]
    fn test_wraps_past_65() {
        let colors = categorical(70);
        assert_eq!(colors.len(), 70);
        assert_eq!(colors[65], colors[0]);
    }
}
