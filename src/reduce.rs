use crate::attr::Attributes;
use crate::dither::Disperser;
use crate::error::Error;
use crate::invmap::InverseColorMap;
use crate::octree::ColorOctree;
use crate::pal::{is_transparent, unpack, PalIndex, Palette, MAX_COLORS, RGBA};

/// Borrowed view of a full-color raster, `0xAARRGGBB` packed pixels in
/// row-major order. May additionally carry an already-indexed form, which
/// lets reductions that fit the color budget pass through unchanged.
pub struct RasterView<'a> {
    pixels: &'a [u32],
    width: usize,
    height: usize,
    indexed: Option<(&'a [u8], &'a [RGBA])>,
}

impl<'a> RasterView<'a> {
    pub fn new(pixels: &'a [u32], width: usize, height: usize) -> Result<Self, Error> {
        let len = width.checked_mul(height).ok_or(Error::InvalidArgument)?;
        if width == 0 || height == 0 || pixels.len() < len {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            pixels,
            width,
            height,
            indexed: None,
        })
    }

    /// A view that already carries a palette and index plane, e.g. decoded
    /// from an indexed file format.
    pub fn new_indexed(
        pixels: &'a [u32],
        width: usize,
        height: usize,
        indices: &'a [u8],
        palette: &'a [RGBA],
    ) -> Result<Self, Error> {
        let mut view = Self::new(pixels, width, height)?;
        let len = width * height;
        if indices.len() < len || palette.is_empty() || palette.len() > MAX_COLORS {
            return Err(Error::InvalidArgument);
        }
        if indices[..len].iter().any(|&i| usize::from(i) >= palette.len()) {
            return Err(Error::InvalidArgument);
        }
        view.indexed = Some((indices, palette));
        Ok(view)
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    fn len(&self) -> usize {
        self.width * self.height
    }

    fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.pixels[..self.len()].chunks_exact(self.width)
    }
}

/// The product of a reduction: one palette index per pixel plus the palette
/// the indices refer to.
pub struct IndexedRaster {
    width: usize,
    height: usize,
    pixels: Vec<PalIndex>,
    palette: Palette,
}

impl IndexedRaster {
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// One byte per pixel, row-major.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[PalIndex] {
        &self.pixels
    }

    #[inline]
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Expands the index plane back to RGBA pixels.
    #[must_use]
    pub fn remapped_rgba(&self) -> Vec<RGBA> {
        self.pixels.iter().map(|&i| self.palette[i]).collect()
    }
}

pub(crate) fn reduce_impl(attr: &Attributes, image: &RasterView<'_>, dither: bool) -> Result<IndexedRaster, Error> {
    if let Some((indices, colors)) = image.indexed {
        if colors.len() <= attr.max_colors {
            attr.verbose_print("  already indexed, palette fits");
            return Ok(IndexedRaster {
                width: image.width,
                height: image.height,
                pixels: indices[..image.len()].to_vec(),
                palette: Palette::from_colors_as_is(colors)?,
            });
        }
    }
    let mut tree = ColorOctree::new(attr.max_colors)?;
    for row in image.rows() {
        tree.add_colors(row);
    }
    let palette = tree.build_palette()?;
    attr.verbose_print(format!(
        "  {} colors for {}x{} pixels{}",
        palette.len(),
        image.width,
        image.height,
        if tree.has_alpha() { " (one transparent)" } else { "" }
    ));
    finish(image, palette, dither)
}

pub(crate) fn reduce_fixed_impl(attr: &Attributes, image: &RasterView<'_>, colors: &[RGBA], dither: bool) -> Result<IndexedRaster, Error> {
    let palette = Palette::from_colors(colors)?;
    attr.verbose_print(format!("  remapping to a fixed {}-color palette", palette.len()));
    finish(image, palette, dither)
}

fn finish(image: &RasterView<'_>, palette: Palette, dither: bool) -> Result<IndexedRaster, Error> {
    let pixels = if palette.opaque_colors().is_empty() {
        // Nothing to diffuse against: the palette is the reserved
        // transparent slot alone, so every pixel takes it.
        let t = palette.transparent_index().ok_or(Error::InvalidArgument)?;
        vec![t; image.len()]
    } else if dither {
        remap_floyd(image, &palette)?
    } else {
        remap_direct(image, &palette)?
    };
    Ok(IndexedRaster {
        width: image.width,
        height: image.height,
        pixels,
        palette,
    })
}

/// Single linear pass, one O(1) lookup per pixel, no error diffusion.
fn remap_direct(image: &RasterView<'_>, palette: &Palette) -> Result<Vec<PalIndex>, Error> {
    let invmap = InverseColorMap::new(palette.opaque_colors())?;
    let transparent = palette.transparent_index();
    let mut out = Vec::with_capacity(image.len());
    for &px in &image.pixels[..image.len()] {
        let idx = match transparent {
            Some(t) if is_transparent(px) => t,
            _ => invmap.nearest(unpack(px)),
        };
        out.push(idx);
    }
    Ok(out)
}

/// One disperser for the whole image, rows fed strictly top-to-bottom.
fn remap_floyd(image: &RasterView<'_>, palette: &Palette) -> Result<Vec<PalIndex>, Error> {
    let mut disperser = Disperser::new(palette, image.width)?;
    let mut out = Vec::with_capacity(image.len());
    for row in image.rows() {
        out.extend_from_slice(&disperser.dither_row(row)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::pack;

    const RED: u32 = 0xFFFF0000;
    const BLUE: u32 = 0xFF0000FF;

    #[test]
    fn rejects_bad_rasters() {
        assert!(RasterView::new(&[], 0, 0).is_err());
        assert!(RasterView::new(&[0; 3], 2, 2).is_err());
        assert!(RasterView::new(&[0; 4], 2, 2).is_ok());
    }

    #[test]
    fn two_color_image_two_color_budget() {
        let pixels = [RED, RED, BLUE, BLUE];
        let image = RasterView::new(&pixels, 4, 1).unwrap();
        let mut attr = Attributes::new();
        attr.set_max_colors(2).unwrap();
        let out = attr.reduce(&image).unwrap();
        assert_eq!(2, out.palette().len());
        let idx = out.pixels();
        assert_eq!(idx[0], idx[1]);
        assert_eq!(idx[2], idx[3]);
        assert_ne!(idx[0], idx[2]);
        // two distinct colors within budget reproduce exactly
        assert_eq!(unpack(RED), out.palette()[idx[0]]);
        assert_eq!(unpack(BLUE), out.palette()[idx[2]]);
    }

    #[test]
    fn fully_transparent_image() {
        let pixels = [0u32; 9];
        let image = RasterView::new(&pixels, 3, 3).unwrap();
        let mut attr = Attributes::new();
        attr.set_max_colors(4).unwrap();
        for out in [attr.reduce(&image).unwrap(), attr.reduce_dithered(&image).unwrap()] {
            assert!(out.palette().len() <= 5);
            let t = out.palette().transparent_index().unwrap();
            assert_eq!(usize::from(t), out.palette().len() - 1);
            assert!(out.pixels().iter().all(|&i| i == t));
        }
    }

    #[test]
    fn indexed_input_passes_through() {
        let pixels = [RED, BLUE, RED, BLUE];
        let indices = [0u8, 1, 0, 1];
        let colors = [unpack(RED), unpack(BLUE)];
        let image = RasterView::new_indexed(&pixels, 2, 2, &indices, &colors).unwrap();
        let mut attr = Attributes::new();
        attr.set_max_colors(16).unwrap();
        let out = attr.reduce(&image).unwrap();
        assert_eq!(&indices[..], out.pixels());
        assert_eq!(&colors[..], out.palette().as_slice());

        // too many entries for the budget: quantized instead
        attr.set_max_colors(1).unwrap();
        let out = attr.reduce(&image).unwrap();
        assert_eq!(1, out.palette().len());
    }

    #[test]
    fn fixed_palette_remap() {
        let pixels = [
            pack(RGBA::new(10, 10, 10, 255)),
            pack(RGBA::new(240, 240, 240, 255)),
            pack(RGBA::new(200, 0, 0, 255)),
            pack(RGBA::new(30, 30, 30, 255)),
        ];
        let image = RasterView::new(&pixels, 2, 2).unwrap();
        let colors = [
            RGBA::new(0, 0, 0, 255),
            RGBA::new(255, 255, 255, 255),
            RGBA::new(255, 0, 0, 255),
        ];
        let attr = Attributes::new();
        let out = attr.reduce_fixed_palette(&image, &colors).unwrap();
        assert_eq!(&[0u8, 1, 2, 0][..], out.pixels());
        assert_eq!(&colors[..], out.palette().as_slice());
    }

    #[test]
    fn remapped_rgba_expands() {
        let pixels = [RED, BLUE];
        let image = RasterView::new(&pixels, 2, 1).unwrap();
        let mut attr = Attributes::new();
        attr.set_max_colors(2).unwrap();
        let out = attr.reduce(&image).unwrap();
        let rgba = out.remapped_rgba();
        assert_eq!(vec![unpack(RED), unpack(BLUE)], rgba);
    }
}
