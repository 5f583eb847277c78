//! A tiny bitmap font for grid annotations
//!
//! Annotation labels are coordinate values, so the glyph set covers digits,
//! sign, decimal point and a few unit letters. Glyphs are 3x5 cells, scaled by
//! an integer factor and separated by one empty column.

use image::{Rgba, RgbaImage};

use crate::composition::{blend_pixel_at, AnnotationDirection, BlendMode};

pub const GLYPH_WIDTH: u32 = 3;
pub const GLYPH_HEIGHT: u32 = 5;
const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Rows top to bottom, bit 2 is the left column.
fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b011, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ' ' => [0b000; 5],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'N' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        _ => return None,
    };
    Some(rows)
}

/// Width and height in pixels of `text` laid out horizontally.
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    ((n * ADVANCE - 1) * scale, GLYPH_HEIGHT * scale)
}

/// Bounding box of `text` in the given direction; vertical text is turned a
/// quarter counter-clockwise and reads bottom to top.
pub fn text_box(text: &str, scale: u32, direction: AnnotationDirection) -> (u32, u32) {
    let (w, h) = text_size(text, scale);
    match direction {
        AnnotationDirection::Horizontal => (w, h),
        AnnotationDirection::Vertical => (h, w),
    }
}

/// Draw `text` with its bounding box's top-left corner at `origin`.
///
/// Characters without a glyph leave a blank cell. Returns the number of
/// characters that had no glyph.
pub fn draw_text(
    canvas: &mut RgbaImage,
    text: &str,
    origin: (i64, i64),
    scale: u32,
    direction: AnnotationDirection,
    color: Rgba<u8>,
) -> usize {
    let scale = scale.max(1);
    let (text_w, _) = text_size(text, scale);
    let mut missing = 0;

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            missing += 1;
            continue;
        };
        let cell_x = i as u32 * ADVANCE * scale;
        for (gy, bits) in rows.iter().enumerate() {
            for gx in 0..GLYPH_WIDTH {
                if bits & (0b100 >> gx) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        // position in the horizontal layout
                        let tx = (cell_x + gx * scale + sx) as i64;
                        let ty = (gy as u32 * scale + sy) as i64;
                        let (x, y) = match direction {
                            AnnotationDirection::Horizontal => (tx, ty),
                            AnnotationDirection::Vertical => (ty, text_w as i64 - 1 - tx),
                        };
                        blend_pixel_at(canvas, origin.0 + x, origin.1 + y, color, BlendMode::Normal, 1.0);
                    }
                }
            }
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const INK: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_text_size() {
        assert_eq!(text_size("", 1), (0, 0));
        assert_eq!(text_size("1", 1), (3, 5));
        assert_eq!(text_size("782000", 2), ((6 * 4 - 1) * 2, 10));
        assert_eq!(text_box("12", 1, AnnotationDirection::Vertical), (5, 7));
    }

    #[test]
    fn test_draw_one() {
        let mut canvas = RgbaImage::from_pixel(5, 7, WHITE);
        let missing = draw_text(&mut canvas, "1", (1, 1), 1, AnnotationDirection::Horizontal, INK);
        assert_eq!(missing, 0);
        // the '1' glyph has 8 set cells
        assert_eq!(canvas.pixels().filter(|p| **p == INK).count(), 8);
        assert_eq!(*canvas.get_pixel(2, 1), INK);
        assert_eq!(*canvas.get_pixel(1, 1), WHITE);
    }

    #[test]
    fn test_vertical_text_stays_in_its_box() {
        let (w, h) = text_box("-12.5", 2, AnnotationDirection::Vertical);
        let mut canvas = RgbaImage::from_pixel(w + 4, h + 4, WHITE);
        draw_text(&mut canvas, "-12.5", (2, 2), 2, AnnotationDirection::Vertical, INK);
        for (x, y, p) in canvas.enumerate_pixels() {
            if *p == INK {
                assert!(x >= 2 && x < 2 + w && y >= 2 && y < 2 + h, "ink at {},{}", x, y);
            }
        }
        assert!(canvas.pixels().any(|p| *p == INK));
    }

    #[test]
    fn test_unknown_characters_counted() {
        let mut canvas = RgbaImage::from_pixel(20, 5, WHITE);
        assert_eq!(draw_text(&mut canvas, "1?2", (0, 0), 1, AnnotationDirection::Horizontal, INK), 1);
    }
}
