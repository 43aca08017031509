use crate::error::Error;
use crate::pal::{MAX_COLORS, RGBA};
use crate::reduce::{self, IndexedRaster, RasterView};
use std::sync::Arc;

/// Starting point and settings for the reduction process
#[derive(Clone)]
pub struct Attributes {
    pub(crate) max_colors: usize,
    log_callback: Option<Arc<dyn Fn(&Attributes, &str) + Send + Sync>>,
}

impl Attributes {
    /// New handle for library configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_colors: MAX_COLORS,
            log_callback: None,
        }
    }

    /// Palette size bound, 1-256. Images with transparency use one of the
    /// slots for the reserved transparent entry.
    #[inline]
    pub fn set_max_colors(&mut self, colors: u32) -> Result<(), Error> {
        if !(1..=MAX_COLORS as u32).contains(&colors) {
            return Err(Error::InvalidArgument);
        }
        self.max_colors = colors as usize;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn max_colors(&self) -> u32 {
        self.max_colors as u32
    }

    /// Receives progress messages; there is no logging unless one is set.
    pub fn set_log_callback<F: Fn(&Attributes, &str) + Send + Sync + 'static>(&mut self, callback: F) {
        self.log_callback = Some(Arc::new(callback));
    }

    pub(crate) fn verbose_print(&self, msg: impl AsRef<str>) {
        if let Some(cb) = &self.log_callback {
            cb(self, msg.as_ref());
        }
    }

    /// Reduces an image to at most [`max_colors`](Self::max_colors) colors
    /// by direct nearest-color lookup.
    ///
    /// Streams every pixel through an octree to build the palette, then
    /// maps each pixel in a second pass. An input already carrying an
    /// indexed form that fits the budget is returned unchanged.
    pub fn reduce(&self, image: &RasterView<'_>) -> Result<IndexedRaster, Error> {
        reduce::reduce_impl(self, image, false)
    }

    /// Like [`reduce`](Self::reduce), with Floyd-Steinberg error diffusion
    /// in the remapping pass.
    pub fn reduce_dithered(&self, image: &RasterView<'_>) -> Result<IndexedRaster, Error> {
        reduce::reduce_impl(self, image, true)
    }

    /// Remaps to a caller-supplied palette, e.g. one copied from another
    /// image, skipping palette construction entirely.
    pub fn reduce_fixed_palette(&self, image: &RasterView<'_>, palette: &[RGBA]) -> Result<IndexedRaster, Error> {
        reduce::reduce_fixed_impl(self, image, palette, false)
    }

    /// Like [`reduce_fixed_palette`](Self::reduce_fixed_palette), dithered.
    pub fn reduce_fixed_palette_dithered(&self, image: &RasterView<'_>, palette: &[RGBA]) -> Result<IndexedRaster, Error> {
        reduce::reduce_fixed_impl(self, image, palette, true)
    }
}

impl Default for Attributes {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
