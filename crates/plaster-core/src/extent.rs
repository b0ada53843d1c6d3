//! Two-dimensional pixel extents.

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    /// Zero-sized extent (a minimized window).
    pub const ZERO: Self = Self::new(0, 0);

    /// Create a new extent
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp each dimension into `[min, max]`.
    #[inline]
    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self {
            width: self.width.clamp(min.width, max.width.max(min.width)),
            height: self.height.clamp(min.height, max.height.max(min.height)),
        }
    }

    /// Width divided by height, or 1.0 for a degenerate extent.
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(self) -> f32 {
        if self.is_zero() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl std::fmt::Display for Extent2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_detection() {
        assert!(Extent2d::ZERO.is_zero());
        assert!(Extent2d::new(0, 720).is_zero());
        assert!(Extent2d::new(1280, 0).is_zero());
        assert!(!Extent2d::new(1, 1).is_zero());
    }

    #[test]
    fn clamp_to_bounds() {
        let min = Extent2d::new(64, 64);
        let max = Extent2d::new(1920, 1080);
        assert_eq!(Extent2d::new(4000, 10).clamp(min, max), Extent2d::new(1920, 64));
        assert_eq!(Extent2d::new(800, 600).clamp(min, max), Extent2d::new(800, 600));
    }

    #[test]
    fn aspect() {
        assert!((Extent2d::new(1600, 900).aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
        assert!((Extent2d::ZERO.aspect_ratio() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn display() {
        assert_eq!(Extent2d::new(1280, 720).to_string(), "1280x720");
    }
}
