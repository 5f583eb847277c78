//! Paper size and print resolution

use crate::geometry::PagePoint;

/// Millimetres per inch, for dpi conversions.
pub const MM_PER_INCH: f64 = 25.4;

/// Largest page raster side, in pixels.
pub const MAX_PAGE_PIXELS: u32 = 30_000;

/// Paper size in millimetres plus the print resolution.
///
/// The rendered page raster has integer dimensions: the pixel counts are the
/// page size in inches times the dpi, truncated. Every page-to-pixel mapping
/// uses these truncated counts, so world files and rendered images agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width_mm: f64,
    pub height_mm: f64,
    pub dpi: f64,
}

impl Default for PageSetup {
    /// A4 landscape at 300 dpi.
    fn default() -> Self {
        Self { width_mm: 297.0, height_mm: 210.0, dpi: 300.0 }
    }
}

impl PageSetup {
    pub fn new(width_mm: f64, height_mm: f64, dpi: f64) -> Self {
        Self { width_mm, height_mm, dpi }
    }

    pub fn pixel_width(&self) -> u32 {
        to_pixels(self.width_mm, self.dpi)
    }

    pub fn pixel_height(&self) -> u32 {
        to_pixels(self.height_mm, self.dpi)
    }

    /// True when the paper size and dpi are positive and finite and each side
    /// of the page raster has between one and [`MAX_PAGE_PIXELS`] pixels.
    pub fn is_valid(&self) -> bool {
        [self.width_mm, self.height_mm, self.dpi].iter().all(|v| v.is_finite() && *v > 0.0)
            && [self.width_mm, self.height_mm].iter().all(|mm| {
                let px = raw_pixels(*mm, self.dpi);
                px >= 1.0 && px <= MAX_PAGE_PIXELS as f64
            })
    }

    /// Horizontal and vertical pixels per millimetre of the page raster.
    pub fn pixels_per_mm(&self) -> (f64, f64) {
        (
            self.pixel_width() as f64 / self.width_mm,
            self.pixel_height() as f64 / self.height_mm,
        )
    }

    /// Page millimetres to fractional raster pixels.
    pub fn to_pixel(&self, p: PagePoint) -> (f64, f64) {
        let (sx, sy) = self.pixels_per_mm();
        (p.x * sx, p.y * sy)
    }

    /// Fractional raster pixels to page millimetres.
    pub fn to_page(&self, px: f64, py: f64) -> PagePoint {
        let (sx, sy) = self.pixels_per_mm();
        PagePoint::new(px / sx, py / sy)
    }

    /// A length in millimetres (pen widths, font sizes) in pixels at the print dpi.
    pub fn length_to_pixels(&self, mm: f64) -> f64 {
        mm * self.dpi / MM_PER_INCH
    }
}

fn raw_pixels(mm: f64, dpi: f64) -> f64 {
    (mm * dpi / MM_PER_INCH).floor()
}

fn to_pixels(mm: f64, dpi: f64) -> u32 {
    let px = raw_pixels(mm, dpi);
    if px.is_finite() && px > 0.0 {
        px.min(u32::MAX as f64) as u32
    } else {
        0
    }
}
