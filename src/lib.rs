//! Adaptive color quantization and dithering.
//!
//! Converts full-color (24/32-bit RGBA) rasters into bounded-size
//! indexed-color images: a frequency-weighted octree builds the palette, an
//! inverse color map answers nearest-color queries in O(1), and remapping is
//! either a direct lookup pass or serpentine Floyd-Steinberg error
//! diffusion.
//!
//! ```rust,no_run
//! let pixels: Vec<u32> = vec![0xFF336699; 64 * 64]; // 0xAARRGGBB
//! let image = octquant::RasterView::new(&pixels, 64, 64)?;
//!
//! let mut attr = octquant::new();
//! attr.set_max_colors(16)?;
//! let out = attr.reduce_dithered(&image)?;
//!
//! let table: &[u8] = out.palette().as_bytes(); // R,G,B,A per entry
//! let indices: &[u8] = out.pixels();           // one byte per pixel
//! # Ok::<(), octquant::Error>(())
//! ```
//!
//! The engine is single-threaded and synchronous: it operates purely on
//! in-memory buffers, never blocks on I/O, and runs each reduction to
//! completion. Finished palettes and inverse color maps are immutable and
//! may be shared across threads; octrees and dispersers belong to a single
//! reduction call.

mod attr;
mod dither;
mod error;
mod invmap;
mod octree;
mod pal;
mod reduce;

pub use attr::Attributes;
pub use dither::Disperser;
pub use error::Error;
pub use invmap::InverseColorMap;
pub use octree::ColorOctree;
pub use pal::{pack, unpack, PalIndex, Palette, MAX_COLORS, RGBA};
pub use reduce::{IndexedRaster, RasterView};

/// New handle for library configuration. See [`Attributes`].
#[inline]
#[must_use]
pub fn new() -> Attributes {
    Attributes::new()
}
