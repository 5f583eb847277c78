//! Software renderer for compositions

use image::RgbaImage;
use tracing::{debug, warn};

use crate::composition::{
    blend_pixel_at, blend_pixels, AnnotationLabel, AnnotationPosition, BlendMode, Composition, FrameSide, Grid,
    GridStyle, MapFrame, Overview, PageSetup, Warning,
};
use crate::geometry::{polygon_contains, GeoPoint, PagePoint};
use crate::layer::{LayerSet, MapLayer};

use super::draw::{fill_rect, fill_where, stroke_rect, stroke_segment, PixelRect};
use super::font::{draw_text, text_box, GLYPH_HEIGHT};
use super::{RenderError, RenderedPage, Renderer};

/// Renders compositions pixel by pixel.
///
/// Each map is drawn in composition order: content, overview footprint, grid,
/// grid frame, map frame outline and finally grid annotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterRenderer {
    /// Treat unknown layer names as errors instead of warnings
    pub strict: bool,
}

impl RasterRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Renderer for RasterRenderer {
    fn render(&self, composition: &Composition, layers: &LayerSet) -> Result<RenderedPage, RenderError> {
        let errors = composition.validate();
        if !errors.is_empty() {
            return Err(RenderError::InvalidComposition(errors));
        }

        let page = &composition.page;
        let mut canvas = RgbaImage::from_pixel(page.pixel_width(), page.pixel_height(), composition.background);
        let mut warnings = Vec::new();
        debug!(
            composition = %composition.name,
            width = canvas.width(),
            height = canvas.height(),
            "rendering composition"
        );

        let maps = composition.resolved_maps();
        for map in &maps {
            let mut map_layers: Vec<&dyn MapLayer> = Vec::with_capacity(map.layers.len());
            for name in &map.layers {
                match layers.get(name) {
                    Some(layer) => map_layers.push(layer),
                    None if self.strict => {
                        return Err(RenderError::UnknownLayer { map: map.id.clone(), layer: name.clone() })
                    }
                    None => {
                        warn!(map = %map.id, layer = %name, "skipping unknown layer");
                        warnings.push(Warning::new(format!(
                            "Layer '{}' not found for map '{}'",
                            name, map.id
                        )));
                    }
                }
            }

            draw_map_content(&mut canvas, page, map, &map_layers);

            if let Some(overview) = &map.overview {
                // validate() guarantees the source exists
                if let Some(source) = maps.iter().find(|m| m.id == overview.frame_map) {
                    draw_overview(&mut canvas, page, map, source, overview);
                }
            }

            if let Some(grid) = &map.grid {
                draw_grid(&mut canvas, page, map, grid);
                draw_zebra_frame(&mut canvas, page, map, grid);
            }

            if let Some(frame) = &map.frame {
                let rect = PixelRect::from_page(page, &map.rect);
                stroke_rect(&mut canvas, &rect, page.length_to_pixels(frame.width_mm), frame.color, BlendMode::Normal);
            }

            if let Some(grid) = &map.grid {
                let missing = draw_annotations(&mut canvas, page, map, grid);
                if missing > 0 {
                    warnings.push(Warning::new(format!(
                        "{} annotation characters of map '{}' have no glyph",
                        missing, map.id
                    )));
                }
            }
        }

        let world_file = if composition.world_file.generate {
            Some(composition.compute_world_file_parameters()?)
        } else {
            None
        };

        Ok(RenderedPage { image: canvas, world_file, warnings })
    }
}

/// Background and layers, sampled at each pixel center through the map transform.
fn draw_map_content(canvas: &mut RgbaImage, page: &PageSetup, map: &MapFrame, layers: &[&dyn MapLayer]) {
    let frame = PixelRect::from_page(page, &map.rect);
    let to_geo = map.pixel_to_geo(page);
    let (x0, y0) = (frame.x0.floor().max(0.0) as i64, frame.y0.floor().max(0.0) as i64);
    let (x1, y1) = (
        frame.x1.ceil().min(canvas.width() as f64) as i64,
        frame.y1.ceil().min(canvas.height() as f64) as i64,
    );

    for y in y0..y1 {
        for x in x0..x1 {
            let (cx, cy) = (x as f64 + 0.5, y as f64 + 0.5);
            if !frame.contains(cx, cy) {
                continue;
            }
            let (gx, gy) = to_geo.apply(cx, cy);
            let geo = GeoPoint::new(gx, gy);

            let mut color = map.background;
            for layer in layers {
                if let Some(sample) = layer.sample(geo) {
                    color = blend_pixels(&sample, &color, BlendMode::Normal, sample[3] as f32 / 255.0);
                }
            }
            blend_pixel_at(canvas, x, y, color, map.blend_mode, map.opacity);
        }
    }
}

fn draw_overview(canvas: &mut RgbaImage, page: &PageSetup, map: &MapFrame, source: &MapFrame, overview: &Overview) {
    let Some(footprint) = Overview::footprint(map, source) else {
        return;
    };
    let frame = PixelRect::from_page(page, &map.rect);
    fill_where(canvas, &frame, overview.fill_color, overview.blend_mode, |x, y| {
        let inside = polygon_contains(&footprint, page.to_page(x, y));
        inside != overview.inverted
    });
}

fn draw_grid(canvas: &mut RgbaImage, page: &PageSetup, map: &MapFrame, grid: &Grid) {
    let clip = PixelRect::from_page(page, &map.rect);
    let width = page.length_to_pixels(grid.pen_width_mm);
    let segments: Vec<(PagePoint, PagePoint)> = match grid.style {
        GridStyle::Solid => grid.grid_lines(map).into_iter().map(|l| (l.start, l.end)).collect(),
        GridStyle::Cross { length_mm } => grid.cross_segments(map, length_mm),
    };
    for (a, b) in segments {
        stroke_segment(canvas, page.to_pixel(a), page.to_pixel(b), width, grid.pen_color, grid.blend_mode, &clip);
    }
}

fn draw_zebra_frame(canvas: &mut RgbaImage, page: &PageSetup, map: &MapFrame, grid: &Grid) {
    let pen = page.length_to_pixels(grid.frame.pen_size_mm);
    for block in grid.zebra_blocks(map) {
        let rect = PixelRect::from_page(page, &block.rect);
        fill_rect(canvas, &rect, block.color, BlendMode::Normal);
        if grid.frame.pen_size_mm > 0.0 {
            stroke_rect(canvas, &rect, pen, grid.frame.pen_color, BlendMode::Normal);
        }
    }
}

/// Draw grid annotations, returning the number of characters without a glyph.
fn draw_annotations(canvas: &mut RgbaImage, page: &PageSetup, map: &MapFrame, grid: &Grid) -> usize {
    let Some(annotation) = &grid.annotation else {
        return 0;
    };
    let font_px = page.length_to_pixels(annotation.font_size_mm);
    let scale = ((font_px / GLYPH_HEIGHT as f64).round() as u32).max(1);

    let mut missing = 0;
    for label in grid.annotations(map) {
        let origin = label_origin(page, &label, scale);
        missing += draw_text(canvas, &label.text, origin, scale, label.direction, annotation.font_color);
    }
    missing
}

/// Top-left pixel of a label's box: beside the anchor on the far side from
/// the frame edge, centered along the edge.
fn label_origin(page: &PageSetup, label: &AnnotationLabel, scale: u32) -> (i64, i64) {
    let (w, h) = text_box(&label.text, scale, label.direction);
    let (w, h) = (w as f64, h as f64);
    let (ax, ay) = page.to_pixel(label.anchor);

    let (nx, ny) = match label.side {
        FrameSide::Left => (-1.0, 0.0),
        FrameSide::Right => (1.0, 0.0),
        FrameSide::Top => (0.0, -1.0),
        FrameSide::Bottom => (0.0, 1.0),
    };
    let (nx, ny) = match label.position {
        AnnotationPosition::Inside => (-nx, -ny),
        _ => (nx, ny),
    };

    let place = |anchor: f64, normal: f64, size: f64| {
        if normal > 0.0 {
            anchor
        } else if normal < 0.0 {
            anchor - size
        } else {
            anchor - size / 2.0
        }
    };
    (place(ax, nx, w).round() as i64, place(ay, ny, h).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{FrameStyle, GridAnnotation, GridFrameStyle};
    use crate::geometry::{Extent, PageRect};
    use crate::layer::SolidLayer;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// A small page: 100 x 50 mm at 25.4 dpi, so one pixel per millimetre.
    fn small_page() -> PageSetup {
        PageSetup::new(100.0, 50.0, 25.4)
    }

    fn small_map() -> MapFrame {
        MapFrame::new("map", PageRect::new(10.0, 10.0, 40.0, 20.0), Extent::new(0.0, 0.0, 400.0, 200.0))
    }

    fn render(comp: &Composition, layers: &LayerSet) -> RenderedPage {
        RasterRenderer::new().render(comp, layers).unwrap()
    }

    #[test]
    fn test_page_size_and_background() {
        let comp = Composition::new("empty", small_page());
        let page = render(&comp, &LayerSet::new());
        assert_eq!(page.image.dimensions(), (100, 50));
        assert!(page.image.pixels().all(|p| *p == WHITE));
        assert!(page.world_file.is_none());
    }

    #[test]
    fn test_layer_fills_map_frame_only() {
        let comp = Composition::new("solid", small_page()).with_map(small_map().with_layer("sea"));
        let layers = LayerSet::new().with(SolidLayer::new("sea", BLUE));
        let page = render(&comp, &layers);

        assert_eq!(*page.image.get_pixel(10, 10), BLUE);
        assert_eq!(*page.image.get_pixel(49, 29), BLUE);
        assert_eq!(*page.image.get_pixel(9, 10), WHITE);
        assert_eq!(*page.image.get_pixel(50, 29), WHITE);
        assert_eq!(page.image.pixels().filter(|p| **p == BLUE).count(), 40 * 20);
    }

    #[test]
    fn test_unknown_layer_warns_or_fails() {
        let comp = Composition::new("missing", small_page()).with_map(small_map().with_layer("nope"));
        let page = render(&comp, &LayerSet::new());
        assert_eq!(page.warnings.len(), 1);
        assert!(page.warnings[0].message.contains("nope"));

        let err = RasterRenderer::new().strict(true).render(&comp, &LayerSet::new()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownLayer { .. }));
    }

    #[test]
    fn test_invalid_composition_rejected() {
        let comp = Composition::new("bad", small_page())
            .with_map(small_map().with_extent(Extent::new(0.0, 0.0, 0.0, 10.0)));
        let err = RasterRenderer::new().render(&comp, &LayerSet::new()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidComposition(_)));
        assert!(err.to_string().contains("invalid extent"));
    }

    #[test]
    fn test_oversized_page_rejected_before_allocation() {
        let comp = Composition::new("huge", PageSetup::new(297.0, 210.0, 1.0e7)).with_map(small_map());
        match RasterRenderer::new().render(&comp, &LayerSet::new()) {
            Err(RenderError::InvalidComposition(errors)) => assert!(matches!(
                errors.as_slice(),
                [crate::composition::CompositionError::InvalidPage { dpi, .. }] if *dpi == 1.0e7
            )),
            other => panic!("expected invalid page, got {:?}", other.map(|p| p.warnings)),
        }
    }

    #[test]
    fn test_frame_outline_drawn() {
        let frame = FrameStyle { color: Rgba([0, 0, 0, 255]), width_mm: 1.0 };
        let comp = Composition::new("framed", small_page()).with_map(small_map().with_frame(frame));
        let page = render(&comp, &LayerSet::new());
        assert_eq!(*page.image.get_pixel(9, 20), Rgba([0, 0, 0, 255]));
        assert_eq!(*page.image.get_pixel(30, 20), WHITE);
    }

    #[test]
    fn test_solid_grid_lines() {
        let mut grid = Grid::new(100.0, 100.0);
        grid.pen_width_mm = 1.0;
        grid.pen_color = Rgba([0, 255, 0, 255]);
        let comp = Composition::new("grid", small_page()).with_map(small_map().with_grid(grid));
        let page = render(&comp, &LayerSet::new());

        // x = 100 falls 10 mm into the frame
        assert_eq!(*page.image.get_pixel(19, 25), Rgba([0, 255, 0, 255]));
        assert_eq!(*page.image.get_pixel(15, 25), WHITE);
        // the line stops at the frame
        assert_eq!(*page.image.get_pixel(19, 5), WHITE);
    }

    #[test]
    fn test_overview_and_inverted_overview() {
        let source = small_map().with_extent(Extent::new(100.0, 50.0, 200.0, 100.0));
        let mut overview = Overview::new("map");
        overview.fill_color = BLUE;
        let ov_map = MapFrame::new("ov", PageRect::new(60.0, 10.0, 40.0, 20.0), Extent::new(0.0, 0.0, 400.0, 200.0))
            .with_overview(overview.clone());
        let comp = Composition::new("ov", small_page()).with_map(source.clone()).with_map(ov_map.clone());
        let page = render(&comp, &LayerSet::new());

        // footprint spans x 70..80 mm and y 20..25 mm on the page
        assert_eq!(*page.image.get_pixel(75, 22), BLUE);
        assert_eq!(*page.image.get_pixel(65, 22), WHITE);

        overview.inverted = true;
        let comp = Composition::new("ov", small_page())
            .with_map(source)
            .with_map(ov_map.with_overview(overview));
        let page = render(&comp, &LayerSet::new());
        assert_eq!(*page.image.get_pixel(75, 22), WHITE);
        assert_eq!(*page.image.get_pixel(65, 22), BLUE);
        // nothing outside the overview frame
        assert_eq!(*page.image.get_pixel(55, 22), WHITE);
    }

    #[test]
    fn test_zebra_frame_and_annotations_leave_the_map() {
        let mut grid = Grid::new(100.0, 100.0);
        grid.frame.style = GridFrameStyle::Zebra;
        grid.frame.width_mm = 2.0;
        grid.frame.pen_size_mm = 0.0;
        grid.frame.fill_color1 = Rgba([200, 0, 0, 255]);
        grid.frame.fill_color2 = Rgba([0, 200, 0, 255]);
        grid.annotation = Some(GridAnnotation { precision: 0, font_size_mm: 5.0, ..Default::default() });
        let comp = Composition::new("zebra", small_page()).with_map(small_map().with_grid(grid));
        let page = render(&comp, &LayerSet::new());

        // first top block spans x 10..20 mm just above the frame
        assert_eq!(*page.image.get_pixel(12, 9), Rgba([200, 0, 0, 255]));
        assert_eq!(*page.image.get_pixel(22, 9), Rgba([0, 200, 0, 255]));
        // annotation ink somewhere below the bottom zebra band
        let ink = (0..100).any(|x| (33..40).any(|y| *page.image.get_pixel(x, y) == Rgba([0, 0, 0, 255])));
        assert!(ink);
        assert!(page.warnings.is_empty());
    }

    #[test]
    fn test_world_file_attached_when_requested() {
        let comp = Composition::new("wf", small_page()).with_map(small_map()).with_world_file_map("map");
        let page = render(&comp, &LayerSet::new());
        let wf = page.world_file.unwrap();
        // 400 units across 40 px
        assert!((wf.coefficients()[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_map_blend_mode_multiplies_with_page() {
        let mut comp = Composition::new("blend", small_page())
            .with_map(small_map().with_layer("sea").with_blend_mode(BlendMode::Multiply));
        comp.background = Rgba([128, 128, 128, 255]);
        let layers = LayerSet::new().with(SolidLayer::new("sea", WHITE));
        let page = render(&comp, &layers);
        assert_eq!(*page.image.get_pixel(20, 20), Rgba([128, 128, 128, 255]));
    }
}
