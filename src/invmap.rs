use crate::error::Error;
use crate::pal::{PalIndex, MAX_COLORS, RGBA};

/// Grid resolution: the top 5 bits of each channel address a cell.
const SIDE: usize = 32;
const CELLS: usize = SIDE * SIDE * SIDE;
/// Cell width in 8-bit channel units
const STEP: i32 = 256 / SIDE as i32;
const HALF: i32 = STEP / 2;
/// Second difference of a squared distance walked in STEP increments
const TWO_STEP_SQ: i32 = 2 * STEP * STEP;

/// Precomputed nearest-palette-index lookup over a coarse 32x32x32 RGB grid.
///
/// Valid only for the palette it was built from; a changed palette needs a
/// rebuild ([`Error::PaletteMismatch`] is the caller's contract, not a
/// runtime check). The 5-bit quantization bounds the lookup error by the
/// cell half-width (4 levels per channel) in exchange for O(1) queries.
pub struct InverseColorMap {
    grid: Box<[PalIndex]>,
}

impl InverseColorMap {
    /// Fills the grid with the closest palette entry (squared Euclidean RGB
    /// distance) for every cell center.
    ///
    /// Per palette color the distance to the origin cell's center is
    /// computed once analytically; the rest of the grid is walked with a
    /// second-difference recurrence, so each cell costs three additions
    /// instead of a fresh distance. Earlier palette entries win ties.
    pub fn new(palette: &[RGBA]) -> Result<Self, Error> {
        if palette.is_empty() || palette.len() > MAX_COLORS {
            return Err(Error::InvalidArgument);
        }
        let mut grid = vec![0 as PalIndex; CELLS].into_boxed_slice();
        let mut dist = vec![i32::MAX; CELLS].into_boxed_slice();
        for (idx, color) in palette.iter().enumerate() {
            let dr = i32::from(color.r) - HALF;
            let dg = i32::from(color.g) - HALF;
            let db = i32::from(color.b) - HALF;
            let rinc0 = STEP * STEP - 2 * STEP * dr;
            let ginc0 = STEP * STEP - 2 * STEP * dg;
            let binc0 = STEP * STEP - 2 * STEP * db;
            let mut rdist = dr * dr + dg * dg + db * db;
            let mut rinc = rinc0;
            let mut j = 0usize;
            for _ in 0..SIDE {
                let mut gdist = rdist;
                let mut ginc = ginc0;
                for _ in 0..SIDE {
                    let mut bdist = gdist;
                    let mut binc = binc0;
                    for _ in 0..SIDE {
                        if bdist < dist[j] {
                            dist[j] = bdist;
                            grid[j] = idx as PalIndex;
                        }
                        j += 1;
                        bdist += binc;
                        binc += TWO_STEP_SQ;
                    }
                    gdist += ginc;
                    ginc += TWO_STEP_SQ;
                }
                rdist += rinc;
                rinc += TWO_STEP_SQ;
            }
        }
        Ok(Self { grid })
    }

    /// Nearest palette index for a color, O(1). Alpha is ignored.
    #[inline]
    #[must_use]
    pub fn nearest(&self, color: RGBA) -> PalIndex {
        let r = (color.r >> 3) as usize;
        let g = (color.g >> 3) as usize;
        let b = (color.b >> 3) as usize;
        self.grid[r << 10 | g << 5 | b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist_sq(a: (i32, i32, i32), c: RGBA) -> i32 {
        let dr = a.0 - i32::from(c.r);
        let dg = a.1 - i32::from(c.g);
        let db = a.2 - i32::from(c.b);
        dr * dr + dg * dg + db * db
    }

    #[test]
    fn rejects_empty_palette() {
        assert!(InverseColorMap::new(&[]).is_err());
    }

    #[test]
    fn recurrence_matches_brute_force() {
        let palette = [
            RGBA::new(0, 0, 0, 255),
            RGBA::new(255, 255, 255, 255),
            RGBA::new(200, 30, 30, 255),
            RGBA::new(30, 200, 30, 255),
            RGBA::new(30, 30, 200, 255),
            RGBA::new(128, 128, 0, 255),
            RGBA::new(17, 99, 203, 255),
            RGBA::new(250, 128, 5, 255),
        ];
        let map = InverseColorMap::new(&palette).unwrap();
        for r in 0..32 {
            for g in 0..32 {
                for b in 0..32 {
                    let center = (r * 8 + 4, g * 8 + 4, b * 8 + 4);
                    let best = palette
                        .iter()
                        .enumerate()
                        .min_by_key(|&(_, &c)| dist_sq(center, c))
                        .map(|(i, _)| i as PalIndex)
                        .unwrap();
                    let got = map.nearest(RGBA::new(center.0 as u8, center.1 as u8, center.2 as u8, 255));
                    // an equal-distance runner-up is fine, a worse pick is not
                    assert_eq!(
                        dist_sq(center, palette[best as usize]),
                        dist_sq(center, palette[got as usize]),
                        "cell ({r},{g},{b})"
                    );
                }
            }
        }
    }

    #[test]
    fn exact_palette_colors_resolve_to_themselves() {
        // cell centers, so no quantization error at all
        let palette = [
            RGBA::new(4, 4, 4, 255),
            RGBA::new(132, 4, 4, 255),
            RGBA::new(4, 132, 4, 255),
            RGBA::new(252, 252, 252, 255),
        ];
        let map = InverseColorMap::new(&palette).unwrap();
        for (i, &c) in palette.iter().enumerate() {
            assert_eq!(i as PalIndex, map.nearest(c));
        }
    }

    #[test]
    fn ties_prefer_earlier_entries() {
        let palette = [RGBA::new(100, 100, 100, 255), RGBA::new(100, 100, 100, 255)];
        let map = InverseColorMap::new(&palette).unwrap();
        assert_eq!(0, map.nearest(RGBA::new(100, 100, 100, 255)));
        assert_eq!(0, map.nearest(RGBA::new(0, 0, 0, 255)));
    }
}
