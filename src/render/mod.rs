//! Rendering compositions to page rasters

pub mod draw;
pub mod font;
mod raster;

use image::RgbaImage;
use thiserror::Error;

use crate::composition::{Composition, CompositionError, Warning};
use crate::layer::LayerSet;
use crate::worldfile::{WorldFile, WorldFileError};

pub use raster::RasterRenderer;

/// Error type for rendering
#[derive(Debug, Error)]
pub enum RenderError {
    /// The composition failed validation
    #[error("Invalid composition:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    InvalidComposition(Vec<CompositionError>),
    /// A map names a layer that was not supplied (strict mode)
    #[error("Map '{map}' references unknown layer '{layer}'")]
    UnknownLayer { map: String, layer: String },
    /// World file computation failed
    #[error(transparent)]
    WorldFile(#[from] WorldFileError),
}

/// A rendered page and, when requested, its georeferencing.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub image: RgbaImage,
    pub world_file: Option<WorldFile>,
    pub warnings: Vec<Warning>,
}

/// Turns a composition into a page raster.
pub trait Renderer {
    fn render(&self, composition: &Composition, layers: &LayerSet) -> Result<RenderedPage, RenderError>;
}
