//! Map layers that the renderer samples in map coordinates

use std::collections::HashMap;
use std::path::Path;

use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{Extent, GeoPoint};
use crate::worldfile::{WorldFile, WorldFileError};

/// Error type for loading layers
#[derive(Debug, Error)]
pub enum LayerError {
    /// Image decoding failed
    #[error("failed to read raster '{path}': {source}")]
    Image { path: String, source: image::ImageError },
    /// The raster's world file is missing or malformed
    #[error("failed to georeference raster '{path}': {source}")]
    WorldFile { path: String, source: WorldFileError },
    /// The raster's world file cannot be inverted
    #[error("raster '{0}' has a singular world file")]
    SingularTransform(String),
}

/// Something that has a color at a map coordinate.
pub trait MapLayer: Send + Sync {
    fn name(&self) -> &str;

    /// Color at `p`, `None` where the layer has no data.
    fn sample(&self, p: GeoPoint) -> Option<Rgba<u8>>;
}

/// A georeferenced RGBA raster, sampled nearest-neighbour.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    name: String,
    image: RgbaImage,
    world_file: WorldFile,
    to_pixel: crate::affine::Affine,
}

impl RasterLayer {
    pub fn new(name: impl Into<String>, image: RgbaImage, world_file: WorldFile) -> Result<Self, LayerError> {
        let name = name.into();
        let to_pixel = world_file.transform.inverse().ok_or_else(|| LayerError::SingularTransform(name.clone()))?;
        Ok(Self { name, image, world_file, to_pixel })
    }

    /// A raster covering `extent` exactly, north up.
    pub fn from_extent(name: impl Into<String>, image: RgbaImage, extent: Extent) -> Result<Self, LayerError> {
        let transform = crate::affine::Affine::new(
            extent.width() / image.width() as f64,
            0.0,
            extent.xmin,
            0.0,
            -extent.height() / image.height() as f64,
            extent.ymax,
        );
        Self::new(name, image, WorldFile::new(transform))
    }

    /// Load an image and its world-file sidecar. The layer is named after the
    /// file stem.
    pub fn open(path: &Path) -> Result<Self, LayerError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::open_named(name, path)
    }

    /// Load an image and its world-file sidecar under an explicit name.
    pub fn open_named(name: impl Into<String>, path: &Path) -> Result<Self, LayerError> {
        let image = load_raster(path)?;
        let world_file = WorldFile::read_sidecar(path)
            .map_err(|source| LayerError::WorldFile { path: path.display().to_string(), source })?;
        let name = name.into();
        debug!(layer = %name, width = image.width(), height = image.height(), "loaded raster layer");
        Self::new(name, image, world_file)
    }

    /// Load an image without a sidecar, stretched over `extent`.
    pub fn open_with_extent(name: impl Into<String>, path: &Path, extent: Extent) -> Result<Self, LayerError> {
        Self::from_extent(name, load_raster(path)?, extent)
    }

    pub fn world_file(&self) -> &WorldFile {
        &self.world_file
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl MapLayer for RasterLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&self, p: GeoPoint) -> Option<Rgba<u8>> {
        let (col, row) = self.to_pixel.apply(p.x, p.y);
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (col, row) = (col.floor() as u64, row.floor() as u64);
        if col >= self.image.width() as u64 || row >= self.image.height() as u64 {
            return None;
        }
        Some(*self.image.get_pixel(col as u32, row as u32))
    }
}

fn load_raster(path: &Path) -> Result<RgbaImage, LayerError> {
    Ok(image::open(path)
        .map_err(|source| LayerError::Image { path: path.display().to_string(), source })?
        .to_rgba8())
}

/// A single color everywhere, optionally limited to an extent.
#[derive(Debug, Clone)]
pub struct SolidLayer {
    name: String,
    color: Rgba<u8>,
    extent: Option<Extent>,
}

impl SolidLayer {
    pub fn new(name: impl Into<String>, color: Rgba<u8>) -> Self {
        Self { name: name.into(), color, extent: None }
    }

    pub fn within(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }
}

impl MapLayer for SolidLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&self, p: GeoPoint) -> Option<Rgba<u8>> {
        match &self.extent {
            Some(extent) if !extent.contains_point(p) => None,
            _ => Some(self.color),
        }
    }
}

/// Layers available to a render, by name.
#[derive(Default)]
pub struct LayerSet {
    layers: HashMap<String, Box<dyn MapLayer>>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer, replacing any layer with the same name.
    pub fn insert(&mut self, layer: impl MapLayer + 'static) {
        self.layers.insert(layer.name().to_string(), Box::new(layer));
    }

    pub fn with(mut self, layer: impl MapLayer + 'static) -> Self {
        self.insert(layer);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn MapLayer> {
        self.layers.get(name).map(|l| l.as_ref())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
