//! Blend modes for map content, grids and overview frames

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Painter composition modes available to composition items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Standard alpha compositing (source over destination)
    #[default]
    Normal,
    /// Keeps lighter color: result = max(base, blend)
    Lighten,
    /// Lightens underlying colors: result = 1 - (1 - base) * (1 - blend)
    Screen,
    /// Brightens base by the blend color: result = base / (1 - blend)
    Dodge,
    /// Additive blending: result = min(1, base + blend)
    Addition,
    /// Keeps darker color: result = min(base, blend)
    Darken,
    /// Darkens underlying colors: result = base * blend
    Multiply,
    /// Darkens base by the blend color: result = 1 - (1 - base) / blend
    Burn,
    /// Multiply or screen depending on base brightness
    Overlay,
    /// Gentle overlay, darkens or lightens depending on blend brightness
    SoftLight,
    /// Multiply or screen depending on blend brightness
    HardLight,
    /// Color difference: result = abs(base - blend)
    Difference,
    /// Subtractive blending: result = max(0, base - blend)
    Subtract,
}

impl BlendMode {
    /// All modes, in the order the layout designer lists them.
    pub const ALL: [BlendMode; 13] = [
        BlendMode::Normal,
        BlendMode::Lighten,
        BlendMode::Screen,
        BlendMode::Dodge,
        BlendMode::Addition,
        BlendMode::Darken,
        BlendMode::Multiply,
        BlendMode::Burn,
        BlendMode::Overlay,
        BlendMode::SoftLight,
        BlendMode::HardLight,
        BlendMode::Difference,
        BlendMode::Subtract,
    ];

    /// Parse a blend mode from string
    pub fn from_str(s: &str) -> Option<BlendMode> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "normal" | "sourceover" => Some(BlendMode::Normal),
            "lighten" => Some(BlendMode::Lighten),
            "screen" => Some(BlendMode::Screen),
            "dodge" | "colordodge" => Some(BlendMode::Dodge),
            "addition" | "add" | "plus" => Some(BlendMode::Addition),
            "darken" => Some(BlendMode::Darken),
            "multiply" => Some(BlendMode::Multiply),
            "burn" | "colorburn" => Some(BlendMode::Burn),
            "overlay" => Some(BlendMode::Overlay),
            "softlight" => Some(BlendMode::SoftLight),
            "hardlight" => Some(BlendMode::HardLight),
            "difference" => Some(BlendMode::Difference),
            "subtract" => Some(BlendMode::Subtract),
            _ => None,
        }
    }

    /// Apply blend mode to a single color channel (values are 0.0-1.0)
    pub(crate) fn blend_channel(&self, base: f32, blend: f32) -> f32 {
        match self {
            BlendMode::Normal => blend,
            BlendMode::Lighten => base.max(blend),
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - blend),
            BlendMode::Dodge => {
                if base == 0.0 {
                    0.0
                } else if blend >= 1.0 {
                    1.0
                } else {
                    (base / (1.0 - blend)).min(1.0)
                }
            }
            BlendMode::Addition => (base + blend).min(1.0),
            BlendMode::Darken => base.min(blend),
            BlendMode::Multiply => base * blend,
            BlendMode::Burn => {
                if base >= 1.0 {
                    1.0
                } else if blend <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - base) / blend).min(1.0)
                }
            }
            BlendMode::Overlay => BlendMode::HardLight.blend_channel(blend, base),
            BlendMode::SoftLight => {
                if blend <= 0.5 {
                    base - (1.0 - 2.0 * blend) * base * (1.0 - base)
                } else {
                    let d = if base <= 0.25 {
                        ((16.0 * base - 12.0) * base + 4.0) * base
                    } else {
                        base.sqrt()
                    };
                    base + (2.0 * blend - 1.0) * (d - base)
                }
            }
            BlendMode::HardLight => {
                if blend <= 0.5 {
                    2.0 * base * blend
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - blend)
                }
            }
            BlendMode::Difference => (base - blend).abs(),
            BlendMode::Subtract => (base - blend).max(0.0),
        }
    }
}

/// Blend `src` into the canvas pixel at `(x, y)`.
///
/// Out-of-bounds coordinates are ignored, as are fully transparent sources.
pub(crate) fn blend_pixel_at(
    canvas: &mut RgbaImage,
    x: i64,
    y: i64,
    src: Rgba<u8>,
    mode: BlendMode,
    opacity: f64,
) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let src_alpha = (src[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0) as f32;
    if src_alpha == 0.0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let dst = *canvas.get_pixel(x, y);
    canvas.put_pixel(x, y, blend_pixels(&src, &dst, mode, src_alpha));
}

/// Blend source pixel over destination using the specified blend mode and opacity.
pub(crate) fn blend_pixels(src: &Rgba<u8>, dst: &Rgba<u8>, mode: BlendMode, src_alpha: f32) -> Rgba<u8> {
    let dst_alpha = dst[3] as f32 / 255.0;

    let channel = |i: usize| (src[i] as f32 / 255.0, dst[i] as f32 / 255.0);
    let (src_r, dst_r) = channel(0);
    let (src_g, dst_g) = channel(1);
    let (src_b, dst_b) = channel(2);

    // A transparent backdrop has nothing to blend against
    let blend = |s: f32, d: f32| {
        if dst_alpha == 0.0 {
            s
        } else {
            mode.blend_channel(d, s)
        }
    };
    let blended_r = blend(src_r, dst_r);
    let blended_g = blend(src_g, dst_g);
    let blended_b = blend(src_b, dst_b);

    // out_alpha = src_alpha + dst_alpha * (1 - src_alpha)
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    if out_alpha == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    // out_color = (blended * src_alpha + dst * dst_alpha * (1 - src_alpha)) / out_alpha
    let composite = |blended: f32, dst: f32| -> u8 {
        let result = (blended * src_alpha + dst * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        (result.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([
        composite(blended_r, dst_r),
        composite(blended_g, dst_g),
        composite(blended_b, dst_b),
        (out_alpha * 255.0).round() as u8,
    ])
}
