//! Viewport snapshot attached to every record.

use core::fmt;

use html::Viewport;
use serde::Serialize;

/// Responsive breakpoint derived from the viewport width.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Breakpoint {
    Mobile,
    MobileLandscape,
    Tablet,
    Laptop,
    Desktop,
}

impl Breakpoint {
    #[must_use]
    pub const fn from_width(width: u32) -> Self {
        match width {
            0..640 => Self::Mobile,
            640..768 => Self::MobileLandscape,
            768..1024 => Self::Tablet,
            1024..1280 => Self::Laptop,
            _ => Self::Desktop,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::MobileLandscape => "mobile-landscape",
            Self::Tablet => "tablet",
            Self::Laptop => "laptop",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Window metrics at capture time. Informational only.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportInfo {
    pub width: u32,
    pub height: u32,
    pub breakpoint: Breakpoint,
    pub device_pixel_ratio: f64,
}

impl From<Viewport> for ViewportInfo {
    fn from(viewport: Viewport) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            breakpoint: Breakpoint::from_width(viewport.width),
            device_pixel_ratio: viewport.device_pixel_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_boundaries() {
        assert_eq!(Breakpoint::from_width(0), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(639), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(640), Breakpoint::MobileLandscape);
        assert_eq!(Breakpoint::from_width(767), Breakpoint::MobileLandscape);
        assert_eq!(Breakpoint::from_width(768), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1023), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1024), Breakpoint::Laptop);
        assert_eq!(Breakpoint::from_width(1280), Breakpoint::Desktop);
    }

    #[test]
    fn serializes_with_kebab_breakpoint() {
        let info = ViewportInfo::from(Viewport::new(700, 400, 2.0));
        let json = serde_json::to_value(info).unwrap_or_default();
        assert_eq!(json["breakpoint"], "mobile-landscape");
        assert_eq!(json["devicePixelRatio"], 2.0);
    }
}
