use crate::error::Error;
use arrayvec::ArrayVec;
use rgb::ComponentSlice;

/// 8-bit RGBA in sRGB. This is the only color format *publicly* used by the library.
pub type RGBA = rgb::RGBA<u8>;

/// Index into a [`Palette`]
pub type PalIndex = u8;

/// Palettes are stored on the stack; one byte per index caps them at 256 entries
pub const MAX_COLORS: usize = 256;

/// Unpacks a `0xAARRGGBB` pixel.
#[inline(always)]
#[must_use]
pub fn unpack(px: u32) -> RGBA {
    RGBA {
        r: (px >> 16) as u8,
        g: (px >> 8) as u8,
        b: px as u8,
        a: (px >> 24) as u8,
    }
}

/// Packs a color back into `0xAARRGGBB`.
#[inline(always)]
#[must_use]
pub fn pack(px: RGBA) -> u32 {
    u32::from(px.a) << 24 | u32::from(px.r) << 16 | u32::from(px.g) << 8 | u32::from(px.b)
}

/// Alpha `0x00` is the sole transparency signal; any nonzero alpha is opaque.
#[inline(always)]
pub(crate) fn is_transparent(px: u32) -> bool {
    px >> 24 == 0
}

/// A finished palette: up to [`MAX_COLORS`] colors, plus at most one
/// reserved fully-transparent slot, always kept as the last entry.
///
/// Built once per reduction and immutable afterward.
#[derive(Clone)]
pub struct Palette {
    colors: ArrayVec<RGBA, MAX_COLORS>,
    transparent: Option<PalIndex>,
}

impl Palette {
    pub(crate) fn new() -> Self {
        Self {
            colors: ArrayVec::new(),
            transparent: None,
        }
    }

    /// Palette from caller-supplied colors, e.g. copied from another image.
    ///
    /// A fully-transparent entry (alpha 0), if present, is moved to the last
    /// slot to become the reserved transparent index.
    pub fn from_colors(colors: &[RGBA]) -> Result<Self, Error> {
        if colors.is_empty() || colors.len() > MAX_COLORS {
            return Err(Error::InvalidArgument);
        }
        let mut pal = Self::new();
        for &c in colors {
            pal.colors.push(c);
        }
        if let Some(pos) = pal.colors.iter().position(|c| c.a == 0) {
            let last = pal.colors.len() - 1;
            pal.colors.swap(pos, last);
            pal.transparent = Some(last as PalIndex);
        }
        Ok(pal)
    }

    /// Used by the indexed fast path: keeps the caller's entry order so the
    /// existing indices stay valid. The transparent marker is set only when
    /// the last entry is transparent.
    pub(crate) fn from_colors_as_is(colors: &[RGBA]) -> Result<Self, Error> {
        if colors.is_empty() || colors.len() > MAX_COLORS {
            return Err(Error::InvalidArgument);
        }
        let mut pal = Self::new();
        for &c in colors {
            pal.colors.push(c);
        }
        if pal.colors.last().map_or(false, |c| c.a == 0) {
            pal.transparent = Some((pal.colors.len() - 1) as PalIndex);
        }
        Ok(pal)
    }

    pub(crate) fn push(&mut self, color: RGBA) -> PalIndex {
        let idx = self.colors.len() as PalIndex;
        self.colors.push(color);
        idx
    }

    pub(crate) fn push_transparent(&mut self) {
        debug_assert!(self.transparent.is_none());
        let idx = self.push(RGBA::new(0, 0, 0, 0));
        self.transparent = Some(idx);
    }

    /// All entries, the reserved transparent slot included.
    #[inline(always)]
    #[must_use]
    pub fn as_slice(&self) -> &[RGBA] {
        &self.colors
    }

    /// Entries available to nearest-color resolution, i.e. without the
    /// trailing transparent slot.
    #[must_use]
    pub fn opaque_colors(&self) -> &[RGBA] {
        match self.transparent {
            Some(idx) => &self.colors[..idx as usize],
            None => &self.colors,
        }
    }

    /// Index of the reserved transparent entry, if transparency was present.
    #[inline]
    #[must_use]
    pub fn transparent_index(&self) -> Option<PalIndex> {
        self.transparent
    }

    /// The dense `R, G, B, A` byte table consumed by indexed-image containers.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.colors.as_slice().as_slice()
    }

    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl std::ops::Index<PalIndex> for Palette {
    type Output = RGBA;

    #[inline(always)]
    fn index(&self, idx: PalIndex) -> &RGBA {
        &self.colors[idx as usize]
    }
}
