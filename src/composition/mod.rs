//! Print compositions: a page holding map frames
//!
//! A [`Composition`] is an immutable description of the page. Grids, overview
//! frames and blend modes are plain fields of the maps they belong to, so the
//! rendered result depends only on the record, never on the order settings
//! were applied in.

mod blend;
mod error;
pub mod grid;
mod map;
mod overview;
mod page;

use image::Rgba;
use std::collections::HashSet;
use tracing::debug;

use crate::geometry::Extent;
use crate::worldfile::{compute_world_file, WorldFile, WorldFileError};

// Re-export public API
pub use blend::BlendMode;
pub(crate) use blend::{blend_pixel_at, blend_pixels};
pub use error::{CompositionError, Warning};
pub use grid::{
    AnnotationDirection, AnnotationLabel, AnnotationPosition, FrameSide, Grid, GridAnnotation, GridAxis, GridFrame,
    GridFrameStyle, GridLine, GridStyle, SideAnnotation, ZebraBlock, MAX_ANNOTATION_PRECISION,
};
pub use map::{FrameStyle, MapFrame};
pub use overview::Overview;
pub use page::{PageSetup, MAX_PAGE_PIXELS, MM_PER_INCH};

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, CompositionError>;

/// Which map, if any, georeferences the exported page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldFileSettings {
    /// Write a world file next to exported images
    pub generate: bool,
    /// Id of the map whose transform the world file carries
    pub map: Option<String>,
}

/// A page with map frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub name: String,
    pub page: PageSetup,
    pub background: Rgba<u8>,
    /// Maps in drawing order
    pub maps: Vec<MapFrame>,
    pub world_file: WorldFileSettings,
}

impl Default for Composition {
    fn default() -> Self {
        Self::new("composition", PageSetup::default())
    }
}

impl Composition {
    pub fn new(name: impl Into<String>, page: PageSetup) -> Self {
        Self {
            name: name.into(),
            page,
            background: Rgba([255, 255, 255, 255]),
            maps: Vec::new(),
            world_file: WorldFileSettings::default(),
        }
    }

    pub fn with_map(mut self, map: MapFrame) -> Self {
        self.maps.push(map);
        self
    }

    /// Generate a world file from the map with id `map_id`.
    pub fn with_world_file_map(mut self, map_id: impl Into<String>) -> Self {
        self.world_file = WorldFileSettings { generate: true, map: Some(map_id.into()) };
        self
    }

    pub fn map(&self, id: &str) -> Option<&MapFrame> {
        self.maps.iter().find(|m| m.id == id)
    }

    /// The extent `map` is drawn with, after overview centering.
    pub fn effective_extent(&self, map: &MapFrame) -> Extent {
        match &map.overview {
            Some(overview) if overview.centered => match self.map(&overview.frame_map) {
                Some(source) => overview.overview_extent(&map.extent, &source.extent),
                None => map.extent,
            },
            _ => map.extent,
        }
    }

    /// A copy of the map with its effective extent.
    pub fn resolved_map(&self, id: &str) -> Option<MapFrame> {
        let map = self.map(id)?;
        Some(map.clone().with_extent(self.effective_extent(map)))
    }

    /// All maps with their effective extents, in drawing order.
    pub fn resolved_maps(&self) -> Vec<MapFrame> {
        self.maps.iter().map(|m| m.clone().with_extent(self.effective_extent(m))).collect()
    }

    /// Every structural problem found; empty when the composition is usable.
    pub fn validate(&self) -> Vec<CompositionError> {
        let mut errors = Vec::new();

        if !self.page.is_valid() {
            errors.push(CompositionError::InvalidPage {
                width_mm: self.page.width_mm,
                height_mm: self.page.height_mm,
                dpi: self.page.dpi,
            });
        }

        let mut seen = HashSet::new();
        for map in &self.maps {
            if !seen.insert(map.id.as_str()) {
                errors.push(CompositionError::DuplicateMapId(map.id.clone()));
            }
            if !map.extent.is_valid() {
                errors.push(CompositionError::InvalidExtent {
                    map: map.id.clone(),
                    xmin: map.extent.xmin,
                    ymin: map.extent.ymin,
                    xmax: map.extent.xmax,
                    ymax: map.extent.ymax,
                });
            }
            if !map.rect.is_valid() {
                errors.push(CompositionError::InvalidFrame {
                    map: map.id.clone(),
                    width: map.rect.width,
                    height: map.rect.height,
                });
            }
            if let Some(overview) = &map.overview {
                if overview.frame_map == map.id {
                    errors.push(CompositionError::OverviewSelfReference(map.id.clone()));
                } else if self.map(&overview.frame_map).is_none() {
                    errors.push(CompositionError::UnknownOverviewSource {
                        map: map.id.clone(),
                        source_map: overview.frame_map.clone(),
                    });
                }
            }
        }

        if let Some(id) = &self.world_file.map {
            if self.map(id).is_none() {
                errors.push(CompositionError::UnknownWorldFileMap(id.clone()));
            }
        }

        errors
    }

    /// World file parameters of the page raster, taken from the world-file map.
    pub fn compute_world_file_parameters(&self) -> std::result::Result<WorldFile, WorldFileError> {
        let id = self.world_file.map.as_deref().ok_or(WorldFileError::NoWorldFileMap)?;
        let map = self.resolved_map(id).ok_or_else(|| WorldFileError::UnknownMap(id.to_string()))?;
        let world_file = compute_world_file(&self.page, &map)?;
        debug!(composition = %self.name, map = %id, coefficients = ?world_file.coefficients(), "computed world file");
        Ok(world_file)
    }
}
