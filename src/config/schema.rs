//! Schema types for composition documents
//!
//! A composition document is a TOML file describing the page, the layers the
//! maps draw and the map frames themselves:
//!
//! ```toml
//! [composition]
//! name = "landsat"
//!
//! [page]
//! width_mm = 297
//! height_mm = 210
//! dpi = 300
//!
//! [world_file]
//! map = "map"
//!
//! [[layers]]
//! name = "landsat"
//! path = "landsat.png"
//!
//! [[maps]]
//! id = "map"
//! rect = [20, 20, 200, 100]
//! extent = [781662.375, 3339523.125, 793062.375, 3345223.125]
//! layers = ["landsat"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::color::parse_color;
use crate::composition::{
    AnnotationDirection, AnnotationPosition, BlendMode, GridFrameStyle, PageSetup, MAX_ANNOTATION_PRECISION,
    MAX_PAGE_PIXELS,
};

/// Top-level composition metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionSection {
    /// Composition name, used for control images and reports
    pub name: String,
    /// Page color behind all maps
    #[serde(default = "default_white")]
    pub background: String,
}

/// Paper size and export resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSection {
    #[serde(default = "default_page_width")]
    pub width_mm: f64,
    #[serde(default = "default_page_height")]
    pub height_mm: f64,
    #[serde(default = "default_dpi")]
    pub dpi: f64,
}

impl Default for PageSection {
    fn default() -> Self {
        Self { width_mm: default_page_width(), height_mm: default_page_height(), dpi: default_dpi() }
    }
}

fn default_page_width() -> f64 {
    297.0
}

fn default_page_height() -> f64 {
    210.0
}

fn default_dpi() -> f64 {
    300.0
}

fn default_white() -> String {
    "#FFFFFF".to_string()
}

fn default_black() -> String {
    "#000000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

fn default_blend_mode() -> String {
    "normal".to_string()
}

/// World file export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldFileSection {
    /// Write a sidecar next to rendered pages
    #[serde(default = "default_true")]
    pub generate: bool,
    /// Map whose transform georeferences the page
    pub map: Option<String>,
}

/// A named layer: a georeferenced raster on disk or a solid fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    /// Raster path, relative to the composition file; its world file sits beside it
    pub path: Option<PathBuf>,
    /// Solid fill color, for layers without a raster
    pub color: Option<String>,
    /// Limit a solid layer or georeference a raster without a world file
    pub extent: Option<[f64; 4]>,
}

/// Outline around a map frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_black")]
    pub color: String,
    #[serde(default = "default_frame_width")]
    pub width_mm: f64,
}

fn default_frame_width() -> f64 {
    0.3
}

/// Grid line style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GridStyleConfig {
    #[default]
    Solid,
    Cross,
}

/// Annotation placement on one frame side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct SideConfig {
    #[serde(default)]
    pub position: AnnotationPosition,
    #[serde(default)]
    pub direction: AnnotationDirection,
}

fn default_outside() -> SideConfig {
    SideConfig { position: AnnotationPosition::Outside, direction: AnnotationDirection::Horizontal }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default = "default_black")]
    pub font_color: String,
    #[serde(default = "default_font_size")]
    pub font_size_mm: f64,
    #[serde(default = "default_frame_distance")]
    pub frame_distance_mm: f64,
    #[serde(default = "default_outside")]
    pub left: SideConfig,
    #[serde(default = "default_outside")]
    pub right: SideConfig,
    #[serde(default = "default_outside")]
    pub top: SideConfig,
    #[serde(default = "default_outside")]
    pub bottom: SideConfig,
}

fn default_precision() -> usize {
    3
}

fn default_font_size() -> f64 {
    3.0
}

fn default_frame_distance() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridFrameConfig {
    #[serde(default)]
    pub style: GridFrameStyle,
    #[serde(default = "default_grid_frame_width")]
    pub width_mm: f64,
    #[serde(default = "default_grid_frame_pen")]
    pub pen_size_mm: f64,
    #[serde(default = "default_black")]
    pub pen_color: String,
    #[serde(default = "default_white")]
    pub fill_color1: String,
    #[serde(default = "default_black")]
    pub fill_color2: String,
}

fn default_grid_frame_width() -> f64 {
    2.0
}

fn default_grid_frame_pen() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Line spacing in map units `[x, y]`
    pub interval: [f64; 2],
    #[serde(default)]
    pub offset: [f64; 2],
    #[serde(default)]
    pub style: GridStyleConfig,
    /// Arm length of cross-style grids
    #[serde(default = "default_cross_length")]
    pub cross_length_mm: f64,
    #[serde(default = "default_frame_width")]
    pub pen_width_mm: f64,
    #[serde(default = "default_black")]
    pub pen_color: String,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: String,
    pub annotation: Option<AnnotationConfig>,
    pub frame: Option<GridFrameConfig>,
}

fn default_cross_length() -> f64 {
    3.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewConfig {
    /// Map whose visible area is drawn
    pub frame_map: String,
    #[serde(default = "default_overview_fill")]
    pub fill_color: String,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: String,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub centered: bool,
}

fn default_overview_fill() -> String {
    "rgba(255, 0, 0, 0.3)".to_string()
}

/// A map frame on the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    pub id: String,
    /// Frame `[x, y, width, height]` in millimetres from the page's top-left corner
    pub rect: [f64; 4],
    /// Visible extent `[xmin, ymin, xmax, ymax]` in map units
    pub extent: [f64; 4],
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default = "default_white")]
    pub background: String,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Grow the extent to the frame's aspect ratio
    #[serde(default)]
    pub fit_extent: bool,
    pub frame: Option<FrameConfig>,
    pub grid: Option<GridConfig>,
    pub overview: Option<OverviewConfig>,
}

/// A complete composition document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    pub composition: CompositionSection,
    #[serde(default)]
    pub page: PageSection,
    pub world_file: Option<WorldFileSection>,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub maps: Vec<MapConfig>,
}

/// Validation error for a composition document
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Dotted path of the offending field
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.field, self.message)
    }
}

struct Checker {
    errors: Vec<ConfigValidationError>,
}

impl Checker {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { field: field.into(), message: message.into() });
    }

    fn color(&mut self, field: String, value: &str) {
        if let Err(e) = parse_color(value) {
            self.push(field, format!("is not a valid color: {}", e));
        }
    }

    fn blend_mode(&mut self, field: String, value: &str) {
        if BlendMode::from_str(value).is_none() {
            self.push(field, format!("unknown blend mode '{}'", value));
        }
    }

    fn positive(&mut self, field: String, value: f64) {
        if !(value.is_finite() && value > 0.0) {
            self.push(field, "must be a positive number");
        }
    }

    fn non_negative(&mut self, field: String, value: f64) {
        if !(value.is_finite() && value >= 0.0) {
            self.push(field, "must be zero or positive");
        }
    }
}

impl CompositionConfig {
    /// Validate the document, returning every problem found.
    ///
    /// Colors and blend modes are checked here so conversion into the
    /// composition model cannot fail afterwards.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut c = Checker { errors: Vec::new() };

        if self.composition.name.trim().is_empty() {
            c.push("composition.name", "must be a non-empty string");
        }
        c.color("composition.background".to_string(), &self.composition.background);

        c.positive("page.width_mm".to_string(), self.page.width_mm);
        c.positive("page.height_mm".to_string(), self.page.height_mm);
        c.positive("page.dpi".to_string(), self.page.dpi);
        let page = PageSetup::new(self.page.width_mm, self.page.height_mm, self.page.dpi);
        if c.errors.iter().all(|e| !e.field.starts_with("page.")) && !page.is_valid() {
            c.push("page", format!("raster must be 1 to {} pixels per side at {} dpi", MAX_PAGE_PIXELS, self.page.dpi));
        }

        let mut layer_names = HashSet::new();
        for (i, layer) in self.layers.iter().enumerate() {
            let field = format!("layers[{}]", i);
            if !layer_names.insert(layer.name.as_str()) {
                c.push(format!("{}.name", field), format!("duplicate layer name '{}'", layer.name));
            }
            match (&layer.path, &layer.color) {
                (Some(_), Some(_)) => c.push(field.clone(), "must set either 'path' or 'color', not both"),
                (None, None) => c.push(field.clone(), "must set 'path' or 'color'"),
                (None, Some(color)) => c.color(format!("{}.color", field), color),
                (Some(_), None) => {}
            }
            if let Some(extent) = layer.extent {
                check_extent(&mut c, format!("{}.extent", field), extent);
            }
        }

        let map_ids: HashSet<&str> = self.maps.iter().map(|m| m.id.as_str()).collect();
        for (i, map) in self.maps.iter().enumerate() {
            let field = format!("maps[{}]", i);
            if map.id.trim().is_empty() {
                c.push(format!("{}.id", field), "must be a non-empty string");
            }
            c.positive(format!("{}.rect width", field), map.rect[2]);
            c.positive(format!("{}.rect height", field), map.rect[3]);
            check_extent(&mut c, format!("{}.extent", field), map.extent);
            if !map.rotation.is_finite() {
                c.push(format!("{}.rotation", field), "must be a finite angle");
            }
            if !(0.0..=1.0).contains(&map.opacity) {
                c.push(format!("{}.opacity", field), "must be between 0 and 1");
            }
            c.color(format!("{}.background", field), &map.background);
            c.blend_mode(format!("{}.blend_mode", field), &map.blend_mode);

            if let Some(frame) = &map.frame {
                c.color(format!("{}.frame.color", field), &frame.color);
                c.non_negative(format!("{}.frame.width_mm", field), frame.width_mm);
            }

            if let Some(grid) = &map.grid {
                let g = format!("{}.grid", field);
                c.positive(format!("{}.interval[0]", g), grid.interval[0]);
                c.positive(format!("{}.interval[1]", g), grid.interval[1]);
                c.non_negative(format!("{}.pen_width_mm", g), grid.pen_width_mm);
                c.color(format!("{}.pen_color", g), &grid.pen_color);
                c.blend_mode(format!("{}.blend_mode", g), &grid.blend_mode);
                if grid.style == GridStyleConfig::Cross {
                    c.positive(format!("{}.cross_length_mm", g), grid.cross_length_mm);
                }
                if let Some(annotation) = &grid.annotation {
                    c.color(format!("{}.annotation.font_color", g), &annotation.font_color);
                    c.positive(format!("{}.annotation.font_size_mm", g), annotation.font_size_mm);
                    if annotation.precision > MAX_ANNOTATION_PRECISION {
                        c.push(
                            format!("{}.annotation.precision", g),
                            format!("must be at most {}", MAX_ANNOTATION_PRECISION),
                        );
                    }
                }
                if let Some(frame) = &grid.frame {
                    c.non_negative(format!("{}.frame.width_mm", g), frame.width_mm);
                    c.non_negative(format!("{}.frame.pen_size_mm", g), frame.pen_size_mm);
                    c.color(format!("{}.frame.pen_color", g), &frame.pen_color);
                    c.color(format!("{}.frame.fill_color1", g), &frame.fill_color1);
                    c.color(format!("{}.frame.fill_color2", g), &frame.fill_color2);
                }
            }

            if let Some(overview) = &map.overview {
                let o = format!("{}.overview", field);
                if overview.frame_map == map.id {
                    c.push(format!("{}.frame_map", o), "cannot reference its own map");
                } else if !map_ids.contains(overview.frame_map.as_str()) {
                    c.push(format!("{}.frame_map", o), format!("unknown map '{}'", overview.frame_map));
                }
                c.color(format!("{}.fill_color", o), &overview.fill_color);
                c.blend_mode(format!("{}.blend_mode", o), &overview.blend_mode);
            }
        }

        if let Some(world_file) = &self.world_file {
            if let Some(id) = &world_file.map {
                if !map_ids.contains(id.as_str()) {
                    c.push("world_file.map", format!("unknown map '{}'", id));
                }
            } else if world_file.generate {
                c.push("world_file.map", "is required when generating a world file");
            }
        }

        c.errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn check_extent(c: &mut Checker, field: String, extent: [f64; 4]) {
    let [xmin, ymin, xmax, ymax] = extent;
    if !extent.iter().all(|v| v.is_finite()) || xmax <= xmin || ymax <= ymin {
        c.push(field, "must be [xmin, ymin, xmax, ymax] with xmax > xmin and ymax > ymin");
    }
}
