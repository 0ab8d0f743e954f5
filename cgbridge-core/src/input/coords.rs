//! Pixel → protocol coordinate mapping.
//!
//! The remote host takes two coordinate spaces:
//!
//! - **Pixel**: raw video pixels, used by mouse-move and click.
//! - **Normalized**: `0..=65535` across the screen, used by touch
//!   press / move / release.
//!
//! Both clamp out-of-bounds input to the screen instead of rejecting it.

/// Upper bound of the normalized coordinate range.
pub const NORMALIZED_MAX: u32 = 65_535;

/// Negotiated screen size of a session. Both dimensions are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    /// Returns `None` if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// Scale a pixel value into `0..=65535`.
///
/// `pixel` is clamped to `[0, dimension]` first; the result is
/// `floor(65535 * clamped / dimension)`, integer arithmetic only.
pub fn normalize(pixel: i64, dimension: u32) -> u16 {
    let dim = i64::from(dimension.max(1));
    let clamped = pixel.clamp(0, dim);
    (clamped * i64::from(NORMALIZED_MAX) / dim) as u16
}

/// Which coordinate space a command kind uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSpace {
    Pixel,
    Normalized,
}

impl CoordinateSpace {
    /// Map one axis value into this space.
    pub fn map(self, pixel: i64, dimension: u32) -> u32 {
        match self {
            CoordinateSpace::Pixel => pixel.clamp(0, i64::from(dimension)) as u32,
            CoordinateSpace::Normalized => u32::from(normalize(pixel, dimension)),
        }
    }

    /// Map an `(x, y)` point on `screen`.
    pub fn map_point(self, x: i64, y: i64, screen: ScreenSize) -> (u32, u32) {
        (self.map(x, screen.width), self.map(y, screen.height))
    }
}
