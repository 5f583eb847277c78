//! mapcomposer - Print compositions of georeferenced maps
//!
//! This library provides functionality to:
//! - Describe pages holding map frames, grids and overview frames
//! - Render compositions to page rasters
//! - Compute world files that georeference the exported page
//! - Compare rendered pages against control images

pub mod affine;
pub mod cli;
pub mod color;
pub mod compare;
pub mod composition;
pub mod config;
pub mod geometry;
pub mod layer;
pub mod output;
pub mod render;
pub mod worldfile;

pub use affine::Affine;
pub use composition::{BlendMode, Composition, Grid, MapFrame, Overview, PageSetup};
pub use geometry::{Extent, GeoPoint, PagePoint, PageRect};
pub use render::{RasterRenderer, RenderedPage, Renderer};
pub use worldfile::{compute_world_file, WorldFile, WorldFileError};
