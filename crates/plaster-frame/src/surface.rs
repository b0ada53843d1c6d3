//! Presentation surface abstraction and swapchain parameter selection.

use plaster_core::Extent2d;

/// A window (or fake window) the swapchain presents into.
pub trait Surface {
    /// Current drawable size in pixels. Zero while minimized.
    fn drawable_extent(&self) -> Extent2d;

    /// Whether a resize happened since the flag was last reset.
    fn was_resized(&self) -> bool;

    fn reset_resize_flag(&mut self);

    /// Block, processing window events, until the drawable size is non-zero.
    ///
    /// Returns the zero extent if the window is closed while waiting.
    fn wait_for_non_zero_extent(&mut self) -> Extent2d;
}

/// Pixel format of swapchain images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Bgra8Srgb,
    Bgra8Unorm,
    Rgba8Srgb,
    Rgba8Unorm,
    /// Raw backend format value.
    Other(i32),
}

/// Color space of swapchain images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    Other(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: PixelFormat,
    pub color_space: ColorSpace,
}

impl SurfaceFormat {
    pub const BGRA8_SRGB: Self = Self::new(PixelFormat::Bgra8Srgb, ColorSpace::SrgbNonlinear);

    pub const fn new(format: PixelFormat, color_space: ColorSpace) -> Self {
        Self {
            format,
            color_space,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    Fifo,
    FifoRelaxed,
    Other(i32),
}

/// What the surface supports, queried fresh before every swapchain build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceSupport {
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
    pub min_image_count: u32,
    /// Zero means no upper limit.
    pub max_image_count: u32,
    /// `None` when the surface lets the swapchain decide its size.
    pub current_extent: Option<Extent2d>,
    pub min_extent: Extent2d,
    pub max_extent: Extent2d,
}

impl SurfaceSupport {
    /// True when at least one format and one present mode are offered.
    pub fn is_usable(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Select the best surface format.
///
/// Prefers BGRA8 sRGB with the sRGB non-linear color space, otherwise the
/// first format offered.
pub fn select_surface_format(available: &[SurfaceFormat]) -> Option<SurfaceFormat> {
    available
        .iter()
        .copied()
        .find(|f| *f == SurfaceFormat::BGRA8_SRGB)
        .or_else(|| available.first().copied())
}

/// Select the best present mode.
///
/// FIFO is always available, so it is the vsync choice and the fallback.
pub fn select_present_mode(available: &[PresentMode], vsync: bool) -> PresentMode {
    if !vsync && available.contains(&PresentMode::Mailbox) {
        PresentMode::Mailbox
    } else {
        PresentMode::Fifo
    }
}

/// One more image than the minimum, clamped to the maximum when there is one.
pub fn select_image_count(support: &SurfaceSupport) -> u32 {
    let count = support.min_image_count + 1;
    if support.max_image_count > 0 {
        count.min(support.max_image_count)
    } else {
        count
    }
}

/// The surface's current extent, or the drawable size clamped to the
/// supported range when the surface leaves it undefined.
pub fn select_extent(support: &SurfaceSupport, drawable: Extent2d) -> Extent2d {
    support
        .current_extent
        .unwrap_or_else(|| drawable.clamp(support.min_extent, support.max_extent))
}
