use std::fmt;
pub use Error::*;

/// Error codes
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Function called with invalid arguments, e.g. `max_colors < 1`,
    /// a zero-sized raster, or a row of the wrong width
    InvalidArgument,
    /// Palette queried before any color was added
    NotBuilt,
    /// An [`InverseColorMap`](crate::InverseColorMap) answers only for the
    /// palette it was built from. Rebuilding after a palette change is the
    /// caller's responsibility; a stale map is not detectable at runtime.
    PaletteMismatch,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotBuilt => "NOT_BUILT",
            Self::PaletteMismatch => "PALETTE_MISMATCH",
        })
    }
}

#[test]
fn error_displays() {
    assert_eq!("NOT_BUILT", NotBuilt.to_string());
    assert_eq!("INVALID_ARGUMENT", InvalidArgument.to_string());
}
