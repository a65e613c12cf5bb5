//! Window metrics of the page hosting a [`Document`](crate::Document).

/// Layout viewport size in CSS pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    /// Construct a viewport; a non-finite or non-positive ratio falls back to 1.
    #[must_use]
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width,
            height,
            device_pixel_ratio: ratio,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 800, 1.0)
    }
}
