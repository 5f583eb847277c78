//! Loading composition documents into the composition model
//!
//! Reading goes through three stages: TOML into the schema types, schema
//! validation (every problem reported at once), then conversion into a
//! [`Composition`] plus the [`LayerSet`] its maps draw from. Raster paths are
//! resolved relative to the composition file.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::schema::{CompositionConfig, GridStyleConfig, LayerConfig, MapConfig};
use crate::color::parse_color;
use crate::composition::{
    BlendMode, Composition, FrameStyle, Grid, GridAnnotation, GridFrame, GridStyle, MapFrame, Overview, PageSetup,
    SideAnnotation, WorldFileSettings,
};
use crate::geometry::{Extent, PageRect};
use crate::layer::{LayerError, LayerSet, RasterLayer, SolidLayer};

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read composition: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse composition: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Composition validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// A layer could not be loaded
    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// A composition ready to render.
pub struct LoadedComposition {
    pub composition: Composition,
    pub layers: LayerSet,
    /// File the composition was read from, if any
    pub source: Option<PathBuf>,
}

/// Load a composition document and the layers it references.
pub fn load_composition(path: &Path) -> Result<LoadedComposition, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let base_dir = project_root(path).unwrap_or_else(|| Path::new(""));
    let mut loaded = parse_composition(&contents, base_dir)?;
    loaded.source = Some(path.to_path_buf());
    debug!(
        path = %path.display(),
        maps = loaded.composition.maps.len(),
        layers = loaded.layers.len(),
        "loaded composition"
    );
    Ok(loaded)
}

/// Parse a composition document, resolving raster paths against `base_dir`.
pub fn parse_composition(contents: &str, base_dir: &Path) -> Result<LoadedComposition, ConfigError> {
    let config: CompositionConfig = toml::from_str(contents)?;
    let composition = build_composition(&config)?;
    let mut layers = LayerSet::new();
    for layer in &config.layers {
        load_layer(&mut layers, layer, base_dir)?;
    }
    Ok(LoadedComposition { composition, layers, source: None })
}

/// Validate a parsed document and convert it into a [`Composition`].
pub fn build_composition(config: &CompositionConfig) -> Result<Composition, ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    let page = PageSetup::new(config.page.width_mm, config.page.height_mm, config.page.dpi);
    let mut composition = Composition::new(&config.composition.name, page);
    composition.background = color(&config.composition.background)?;
    if let Some(world_file) = &config.world_file {
        composition.world_file = WorldFileSettings { generate: world_file.generate, map: world_file.map.clone() };
    }
    for map in &config.maps {
        composition = composition.with_map(build_map(map)?);
    }

    // Document checks cover most of this; duplicate ids and the like surface here
    let errors = composition.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(composition)
}

fn build_map(config: &MapConfig) -> Result<MapFrame, ConfigError> {
    let [x, y, width, height] = config.rect;
    let [xmin, ymin, xmax, ymax] = config.extent;
    let mut map = MapFrame::new(&config.id, PageRect::new(x, y, width, height), Extent::new(xmin, ymin, xmax, ymax))
        .with_rotation(config.rotation)
        .with_background(color(&config.background)?)
        .with_blend_mode(blend_mode(&config.blend_mode)?)
        .with_opacity(config.opacity);
    if config.fit_extent {
        map = map.fit_extent_to_frame();
    }
    for layer in &config.layers {
        map = map.with_layer(layer);
    }

    if let Some(frame) = &config.frame {
        map = map.with_frame(FrameStyle { color: color(&frame.color)?, width_mm: frame.width_mm });
    }

    if let Some(g) = &config.grid {
        let mut grid = Grid::new(g.interval[0], g.interval[1]);
        grid.offset_x = g.offset[0];
        grid.offset_y = g.offset[1];
        grid.style = match g.style {
            GridStyleConfig::Solid => GridStyle::Solid,
            GridStyleConfig::Cross => GridStyle::Cross { length_mm: g.cross_length_mm },
        };
        grid.pen_width_mm = g.pen_width_mm;
        grid.pen_color = color(&g.pen_color)?;
        grid.blend_mode = blend_mode(&g.blend_mode)?;

        if let Some(a) = &g.annotation {
            let side = |s: &super::schema::SideConfig| SideAnnotation::new(s.position, s.direction);
            grid.annotation = Some(GridAnnotation {
                precision: a.precision,
                font_color: color(&a.font_color)?,
                font_size_mm: a.font_size_mm,
                frame_distance_mm: a.frame_distance_mm,
                left: side(&a.left),
                right: side(&a.right),
                top: side(&a.top),
                bottom: side(&a.bottom),
            });
        }
        if let Some(f) = &g.frame {
            grid.frame = GridFrame {
                style: f.style,
                width_mm: f.width_mm,
                pen_size_mm: f.pen_size_mm,
                pen_color: color(&f.pen_color)?,
                fill_color1: color(&f.fill_color1)?,
                fill_color2: color(&f.fill_color2)?,
            };
        }
        map = map.with_grid(grid);
    }

    if let Some(o) = &config.overview {
        let mut overview = Overview::new(&o.frame_map);
        overview.fill_color = color(&o.fill_color)?;
        overview.blend_mode = blend_mode(&o.blend_mode)?;
        overview.inverted = o.inverted;
        overview.centered = o.centered;
        map = map.with_overview(overview);
    }

    Ok(map)
}

fn load_layer(layers: &mut LayerSet, config: &LayerConfig, base_dir: &Path) -> Result<(), ConfigError> {
    let extent = config.extent.map(|[xmin, ymin, xmax, ymax]| Extent::new(xmin, ymin, xmax, ymax));
    match (&config.path, &config.color) {
        (Some(path), _) => {
            let path = resolve_path(base_dir, path);
            let layer = match extent {
                Some(extent) => RasterLayer::open_with_extent(&config.name, &path, extent)?,
                None => RasterLayer::open_named(&config.name, &path)?,
            };
            layers.insert(layer);
        }
        (None, Some(value)) => {
            let mut layer = SolidLayer::new(&config.name, color(value)?);
            if let Some(extent) = extent {
                layer = layer.within(extent);
            }
            layers.insert(layer);
        }
        // rejected by validation
        (None, None) => {}
    }
    Ok(())
}

fn color(value: &str) -> Result<image::Rgba<u8>, ConfigError> {
    parse_color(value).map_err(|e| ConfigError::Validation(vec![format!("'{}': {}", value, e)]))
}

fn blend_mode(value: &str) -> Result<BlendMode, ConfigError> {
    BlendMode::from_str(value)
        .ok_or_else(|| ConfigError::Validation(vec![format!("unknown blend mode '{}'", value)]))
}

/// Directory containing a composition file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the composition directory.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
