//! Map frames: a geographic extent placed on the page

use image::Rgba;

use crate::affine::Affine;
use crate::geometry::{Extent, GeoPoint, PagePoint, PageRect};

use super::blend::BlendMode;
use super::grid::Grid;
use super::overview::Overview;
use super::page::PageSetup;

/// Outline drawn around a map frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStyle {
    pub color: Rgba<u8>,
    pub width_mm: f64,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self { color: Rgba([0, 0, 0, 255]), width_mm: 0.3 }
    }
}

/// A map item on the page.
///
/// The extent is shown inside `rect`, rotated by `rotation` degrees about the
/// extent center. Positive angles turn the map content clockwise on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrame {
    pub id: String,
    pub rect: PageRect,
    pub extent: Extent,
    pub rotation: f64,
    /// Layer names, drawn in order (later layers on top)
    pub layers: Vec<String>,
    pub background: Rgba<u8>,
    pub frame: Option<FrameStyle>,
    pub blend_mode: BlendMode,
    pub opacity: f64,
    pub grid: Option<Grid>,
    pub overview: Option<Overview>,
}

impl MapFrame {
    pub fn new(id: impl Into<String>, rect: PageRect, extent: Extent) -> Self {
        Self {
            id: id.into(),
            rect,
            extent,
            rotation: 0.0,
            layers: Vec::new(),
            background: Rgba([255, 255, 255, 255]),
            frame: None,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            grid: None,
            overview: None,
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_layer(mut self, name: impl Into<String>) -> Self {
        self.layers.push(name.into());
        self
    }

    pub fn with_frame(mut self, frame: FrameStyle) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_background(mut self, color: Rgba<u8>) -> Self {
        self.background = color;
        self
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_overview(mut self, overview: Overview) -> Self {
        self.overview = Some(overview);
        self
    }

    /// Grow the extent so its aspect ratio matches the frame.
    pub fn fit_extent_to_frame(mut self) -> Self {
        self.extent = self.extent.fit_to_aspect(self.rect.width / self.rect.height);
        self
    }

    /// Map units per page millimetre along x and y.
    pub fn units_per_mm(&self) -> (f64, f64) {
        (self.extent.width() / self.rect.width, self.extent.height() / self.rect.height)
    }

    /// Page millimetres to map units.
    ///
    /// The unrotated extent fills the frame; the result is then rotated about
    /// the extent center.
    pub fn page_to_geo(&self) -> Affine {
        let (kx, ky) = self.units_per_mm();
        let center = self.extent.center();
        Affine::translation(-self.rect.x, -self.rect.y)
            .then(&Affine::scale(kx, -ky))
            .then(&Affine::translation(self.extent.xmin, self.extent.ymax))
            .then(&Affine::rotation_about(self.rotation, center.x, center.y))
    }

    /// Map units to page millimetres, `None` for a degenerate extent or frame.
    pub fn geo_to_page(&self) -> Option<Affine> {
        self.page_to_geo().inverse()
    }

    /// Page raster pixels to map units. Pixel `(0, 0)` is the top-left corner
    /// of the page raster.
    pub fn pixel_to_geo(&self, page: &PageSetup) -> Affine {
        let (sx, sy) = page.pixels_per_mm();
        Affine::scale(1.0 / sx, 1.0 / sy).then(&self.page_to_geo())
    }

    /// The area of the map actually visible in the frame, in map units.
    ///
    /// Equal to the extent corners when unrotated; otherwise the extent rotated
    /// about its center. Ring order matches [`Extent::corners`].
    pub fn visible_polygon(&self) -> [GeoPoint; 4] {
        let rotate = Affine::rotation_about(self.rotation, self.extent.center().x, self.extent.center().y);
        self.extent.corners().map(|p| {
            let (x, y) = rotate.apply(p.x, p.y);
            GeoPoint::new(x, y)
        })
    }

    /// Map a point in map units onto the page.
    pub fn project(&self, p: GeoPoint) -> Option<PagePoint> {
        let (x, y) = self.geo_to_page()?.apply(p.x, p.y);
        Some(PagePoint::new(x, y))
    }
}
