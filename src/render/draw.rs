//! Raster drawing primitives in page-pixel coordinates
//!
//! Coverage is decided by pixel centers: a pixel is painted when its center
//! `(x + 0.5, y + 0.5)` lies inside the shape. There is no antialiasing.

use image::{Rgba, RgbaImage};

use crate::composition::{blend_pixel_at, BlendMode, PageSetup};
use crate::geometry::PageRect;

/// Axis-aligned rectangle in fractional page pixels, `x1`/`y1` exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelRect {
    pub fn from_page(page: &PageSetup, rect: &PageRect) -> Self {
        let (sx, sy) = page.pixels_per_mm();
        Self { x0: rect.x * sx, y0: rect.y * sy, x1: rect.right() * sx, y1: rect.bottom() * sy }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn inflate(&self, margin: f64) -> Self {
        Self { x0: self.x0 - margin, y0: self.y0 - margin, x1: self.x1 + margin, y1: self.y1 + margin }
    }

    fn intersect(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }
}

/// Integer pixel range covering `bounds`, limited to the canvas.
fn pixel_span(canvas: &RgbaImage, bounds: &PixelRect) -> (i64, i64, i64, i64) {
    let clamp = |v: f64, max: u32| (v.max(0.0).min(max as f64)) as i64;
    (
        clamp(bounds.x0.floor(), canvas.width()),
        clamp(bounds.y0.floor(), canvas.height()),
        clamp(bounds.x1.ceil(), canvas.width()),
        clamp(bounds.y1.ceil(), canvas.height()),
    )
}

/// Paint every pixel in `bounds` whose center satisfies `inside`.
pub fn fill_where<F>(canvas: &mut RgbaImage, bounds: &PixelRect, color: Rgba<u8>, mode: BlendMode, mut inside: F)
where
    F: FnMut(f64, f64) -> bool,
{
    let (x0, y0, x1, y1) = pixel_span(canvas, bounds);
    for y in y0..y1 {
        for x in x0..x1 {
            let (cx, cy) = (x as f64 + 0.5, y as f64 + 0.5);
            if bounds.contains(cx, cy) && inside(cx, cy) {
                blend_pixel_at(canvas, x, y, color, mode, 1.0);
            }
        }
    }
}

pub fn fill_rect(canvas: &mut RgbaImage, rect: &PixelRect, color: Rgba<u8>, mode: BlendMode) {
    fill_where(canvas, rect, color, mode, |_, _| true);
}

/// Outline of `rect` with the pen centered on the border.
pub fn stroke_rect(canvas: &mut RgbaImage, rect: &PixelRect, width: f64, color: Rgba<u8>, mode: BlendMode) {
    let half = (width / 2.0).max(0.5);
    let outer = rect.inflate(half);
    let inner = rect.inflate(-half);
    fill_where(canvas, &outer, color, mode, |x, y| !inner.contains(x, y));
}

/// A straight line of `width` pixels from `p0` to `p1`, painted only inside `clip`.
pub fn stroke_segment(
    canvas: &mut RgbaImage,
    p0: (f64, f64),
    p1: (f64, f64),
    width: f64,
    color: Rgba<u8>,
    mode: BlendMode,
    clip: &PixelRect,
) {
    let half = (width / 2.0).max(0.5);
    let bounds = PixelRect {
        x0: p0.0.min(p1.0) - half,
        y0: p0.1.min(p1.1) - half,
        x1: p0.0.max(p1.0) + half,
        y1: p0.1.max(p1.1) + half,
    }
    .intersect(clip);

    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let len_sq = dx * dx + dy * dy;
    fill_where(canvas, &bounds, color, mode, |x, y| {
        let t = if len_sq == 0.0 { 0.0 } else { (((x - p0.0) * dx + (y - p0.1) * dy) / len_sq).clamp(0.0, 1.0) };
        let (nx, ny) = (p0.0 + t * dx - x, p0.1 + t * dy - y);
        nx * nx + ny * ny <= half * half
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn painted(canvas: &RgbaImage) -> usize {
        canvas.pixels().filter(|p| **p == BLACK).count()
    }

    #[test]
    fn test_fill_rect_by_pixel_centers() {
        let mut canvas = RgbaImage::from_pixel(10, 10, WHITE);
        fill_rect(&mut canvas, &PixelRect { x0: 1.0, y0: 1.0, x1: 4.0, y1: 3.0 }, BLACK, BlendMode::Normal);
        assert_eq!(painted(&canvas), 6);
        assert_eq!(*canvas.get_pixel(1, 1), BLACK);
        assert_eq!(*canvas.get_pixel(4, 1), WHITE);
    }

    #[test]
    fn test_fill_rect_clamped_to_canvas() {
        let mut canvas = RgbaImage::from_pixel(4, 4, WHITE);
        fill_rect(&mut canvas, &PixelRect { x0: -10.0, y0: -10.0, x1: 100.0, y1: 2.0 }, BLACK, BlendMode::Normal);
        assert_eq!(painted(&canvas), 8);
    }

    #[test]
    fn test_stroke_rect_leaves_inside_untouched() {
        let mut canvas = RgbaImage::from_pixel(12, 12, WHITE);
        stroke_rect(&mut canvas, &PixelRect { x0: 2.0, y0: 2.0, x1: 10.0, y1: 10.0 }, 2.0, BLACK, BlendMode::Normal);
        assert_eq!(*canvas.get_pixel(6, 6), WHITE);
        assert_eq!(*canvas.get_pixel(2, 6), BLACK);
        assert_eq!(*canvas.get_pixel(1, 6), BLACK);
        assert_eq!(*canvas.get_pixel(0, 6), WHITE);
    }

    #[test]
    fn test_horizontal_segment() {
        let mut canvas = RgbaImage::from_pixel(10, 10, WHITE);
        let clip = PixelRect { x0: 0.0, y0: 0.0, x1: 10.0, y1: 10.0 };
        stroke_segment(&mut canvas, (0.0, 5.0), (10.0, 5.0), 2.0, BLACK, BlendMode::Normal, &clip);
        // rows 4 and 5 have centers within one pixel of y = 5
        assert_eq!(painted(&canvas), 20);
        assert_eq!(*canvas.get_pixel(3, 4), BLACK);
        assert_eq!(*canvas.get_pixel(3, 6), WHITE);
    }

    #[test]
    fn test_segment_respects_clip() {
        let mut canvas = RgbaImage::from_pixel(10, 10, WHITE);
        let clip = PixelRect { x0: 0.0, y0: 0.0, x1: 5.0, y1: 10.0 };
        stroke_segment(&mut canvas, (0.0, 5.0), (10.0, 5.0), 2.0, BLACK, BlendMode::Normal, &clip);
        assert_eq!(painted(&canvas), 10);
        assert_eq!(*canvas.get_pixel(7, 4), WHITE);
    }

    #[test]
    fn test_thin_segment_still_visible() {
        let mut canvas = RgbaImage::from_pixel(10, 10, WHITE);
        let clip = PixelRect { x0: 0.0, y0: 0.0, x1: 10.0, y1: 10.0 };
        stroke_segment(&mut canvas, (5.5, 0.0), (5.5, 10.0), 0.1, BLACK, BlendMode::Normal, &clip);
        assert_eq!(painted(&canvas), 10);
    }
}
