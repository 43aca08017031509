use crate::error::Error;
use crate::invmap::InverseColorMap;
use crate::pal::{is_transparent, unpack, PalIndex, Palette, RGBA};
use rand::Rng;

/// Fixed-point scale of the error buffers: 10 fractional bits, so a whole
/// image diffuses without floating-point drift.
const ERR_SCALE: i32 = 1024;
/// One sixteenth of the scale; kernel weights multiply this
const SIXTEENTH: i32 = ERR_SCALE / 16;

/// Serpentine Floyd-Steinberg error diffusion against a fixed palette.
///
/// One instance serves one image: rows must be fed top-to-bottom, strictly
/// in order, because each row's output depends on error carried from the
/// previous one. The reserved transparent slot is excluded from the colors
/// available to diffusion; a slot you can never hit would inject unbounded
/// error.
pub struct Disperser {
    invmap: InverseColorMap,
    opaque: Vec<RGBA>,
    transparent: Option<PalIndex>,
    width: usize,
    /// Pending error for the row being scanned, one cell per column plus
    /// one pad cell on each side so the kernel never bounds-checks
    thiserr: Vec<[i32; 3]>,
    nexterr: Vec<[i32; 3]>,
    forward: bool,
}

impl Disperser {
    /// Builds the inverse color map once and seeds the first scanline's
    /// error with uniform jitter in [-1, 1] (fixed-point), so the top row
    /// shows no directional bias.
    pub fn new(palette: &Palette, width: usize) -> Result<Self, Error> {
        if width == 0 {
            return Err(Error::InvalidArgument);
        }
        let opaque = palette.opaque_colors();
        let invmap = InverseColorMap::new(opaque)?;
        let errwidth = width + 2;
        let mut rng = rand::thread_rng();
        let thiserr = (0..errwidth)
            .map(|_| {
                [
                    rng.gen_range(-ERR_SCALE..=ERR_SCALE),
                    rng.gen_range(-ERR_SCALE..=ERR_SCALE),
                    rng.gen_range(-ERR_SCALE..=ERR_SCALE),
                ]
            })
            .collect();
        Ok(Self {
            invmap,
            opaque: opaque.to_vec(),
            transparent: palette.transparent_index(),
            width,
            thiserr,
            nexterr: vec![[0; 3]; errwidth],
            forward: true,
        })
    }

    /// Emits one palette index per pixel, diffusing the residual
    /// quantization error to unprocessed neighbors. Scan direction
    /// alternates every call.
    pub fn dither_row(&mut self, pixels: &[u32]) -> Result<Vec<PalIndex>, Error> {
        if pixels.len() != self.width {
            return Err(Error::InvalidArgument);
        }
        self.nexterr.iter_mut().for_each(|cell| *cell = [0; 3]);
        let mut out = vec![0 as PalIndex; self.width];
        let mut col = if self.forward { 0 } else { self.width - 1 };
        loop {
            let px = pixels[col];
            if is_transparent(px) {
                // straight through; the pending error at this column is dropped
                out[col] = match self.transparent {
                    Some(t) => t,
                    None => self.invmap.nearest(unpack(px)),
                };
            } else {
                let c = unpack(px);
                let pending = self.thiserr[col + 1];
                let r = (i32::from(c.r) + pending[0] / ERR_SCALE).clamp(0, 255);
                let g = (i32::from(c.g) + pending[1] / ERR_SCALE).clamp(0, 255);
                let b = (i32::from(c.b) + pending[2] / ERR_SCALE).clamp(0, 255);
                let matched = self.invmap.nearest(RGBA::new(r as u8, g as u8, b as u8, 255));
                out[col] = matched;
                let chosen = self.opaque[matched as usize];
                let err = [
                    (r - i32::from(chosen.r)) * SIXTEENTH,
                    (g - i32::from(chosen.g)) * SIXTEENTH,
                    (b - i32::from(chosen.b)) * SIXTEENTH,
                ];
                if self.forward {
                    spread(&mut self.thiserr[col + 2], err, 7);
                    spread(&mut self.nexterr[col], err, 3);
                    spread(&mut self.nexterr[col + 1], err, 5);
                    spread(&mut self.nexterr[col + 2], err, 1);
                } else {
                    spread(&mut self.thiserr[col], err, 7);
                    spread(&mut self.nexterr[col + 2], err, 3);
                    spread(&mut self.nexterr[col + 1], err, 5);
                    spread(&mut self.nexterr[col], err, 1);
                }
            }
            if self.forward {
                col += 1;
                if col >= self.width {
                    break;
                }
            } else {
                if col == 0 {
                    break;
                }
                col -= 1;
            }
        }
        std::mem::swap(&mut self.thiserr, &mut self.nexterr);
        self.forward = !self.forward;
        Ok(out)
    }
}

#[inline]
fn spread(cell: &mut [i32; 3], err: [i32; 3], weight: i32) {
    for ch in 0..3 {
        cell[ch] += err[ch] * weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::pack;

    fn bw_palette() -> Palette {
        Palette::from_colors(&[RGBA::new(0, 0, 0, 255), RGBA::new(255, 255, 255, 255)]).unwrap()
    }

    #[test]
    fn rejects_zero_width() {
        assert!(Disperser::new(&bw_palette(), 0).is_err());
    }

    #[test]
    fn rejects_wrong_row_width() {
        let mut d = Disperser::new(&bw_palette(), 4).unwrap();
        assert!(d.dither_row(&[0xFF000000; 3]).is_err());
        assert!(d.dither_row(&[0xFF000000; 4]).is_ok());
    }

    #[test]
    fn solid_gray_average_converges() {
        let width = 64;
        let mut d = Disperser::new(&bw_palette(), width).unwrap();
        let row = vec![pack(RGBA::new(128, 128, 128, 255)); width];
        let mut whites = 0usize;
        for _ in 0..64 {
            let out = d.dither_row(&row).unwrap();
            whites += out.iter().filter(|&&i| i == 1).count();
        }
        let mean = whites as f64 * 255.0 / (width * 64) as f64;
        // the defining property of error diffusion: the regional average
        // tracks the source color even though neither output color is close
        assert!((mean - 128.0).abs() < 6.0, "mean {mean}");
    }

    #[test]
    fn transparent_passes_through() {
        let pal = Palette::from_colors(&[
            RGBA::new(0, 0, 0, 255),
            RGBA::new(255, 255, 255, 255),
            RGBA::new(0, 0, 0, 0),
        ])
        .unwrap();
        let mut d = Disperser::new(&pal, 3).unwrap();
        let row = [pack(RGBA::new(250, 250, 250, 255)), 0x00123456, pack(RGBA::new(5, 5, 5, 255))];
        let out = d.dither_row(&row).unwrap();
        assert_eq!(pal.transparent_index().unwrap(), out[1]);
        assert_eq!(1, out[0]);
        assert_eq!(0, out[2]);
    }

    #[test]
    fn exact_colors_dither_losslessly() {
        // every input is a palette color, so no error ever accumulates
        // beyond the first-row jitter
        let pal = Palette::from_colors(&[RGBA::new(0, 0, 0, 255), RGBA::new(255, 255, 255, 255)]).unwrap();
        let mut d = Disperser::new(&pal, 8).unwrap();
        d.thiserr.iter_mut().for_each(|cell| *cell = [0; 3]);
        let row: Vec<u32> = (0..8)
            .map(|i| if i % 2 == 0 { pack(RGBA::new(0, 0, 0, 255)) } else { pack(RGBA::new(255, 255, 255, 255)) })
            .collect();
        for _ in 0..4 {
            let out = d.dither_row(&row).unwrap();
            for (i, &idx) in out.iter().enumerate() {
                assert_eq!((i % 2) as PalIndex, idx);
            }
        }
    }
}
