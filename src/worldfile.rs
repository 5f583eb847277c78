//! World files: georeferencing sidecars for rendered pages
//!
//! A world file stores six affine coefficients, one per line, in the order
//! `A D B E C F`:
//!
//! ```text
//! x = A * column + B * row + C
//! y = D * column + E * row + F
//! ```
//!
//! On disk `C, F` address the center of the top-left pixel. In memory a
//! [`WorldFile`] addresses pixel corners, so `(0, 0)` is the top-left corner of
//! the raster; conversion happens when reading and writing sidecars.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::affine::Affine;
use crate::composition::{MapFrame, PageSetup};
use crate::geometry::{Extent, GeoPoint};

/// Error type for world file computation and I/O
#[derive(Debug, Error)]
pub enum WorldFileError {
    /// Extent with zero or negative width or height, or non-finite bounds
    #[error("invalid extent ({}, {}, {}, {}): width and height must be positive", .0.xmin, .0.ymin, .0.xmax, .0.ymax)]
    InvalidExtent(Extent),
    /// Map frame with non-positive size on the page
    #[error("invalid map frame size {width}x{height} mm")]
    InvalidFrame { width: f64, height: f64 },
    /// Paper size or dpi that yields an empty page raster
    #[error("invalid page {width_mm}x{height_mm} mm at {dpi} dpi")]
    InvalidPage { width_mm: f64, height_mm: f64, dpi: f64 },
    /// The composition names no world-file map
    #[error("no world file map set on composition")]
    NoWorldFileMap,
    /// The world-file map id does not exist
    #[error("world file map '{0}' not found")]
    UnknownMap(String),
    /// Malformed world file text
    #[error("malformed world file: {0}")]
    Parse(String),
    /// File I/O error
    #[error("world file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pixel-to-map transform of a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFile {
    pub transform: Affine,
}

impl WorldFile {
    pub fn new(transform: Affine) -> Self {
        Self { transform }
    }

    /// Coefficients in affine row order `(a, b, c, d, e, f)`.
    pub fn coefficients(&self) -> [f64; 6] {
        self.transform.coefficients()
    }

    /// Coefficients in sidecar order `(A, D, B, E, C, F)`, still corner based.
    pub fn world_file_order(&self) -> [f64; 6] {
        let t = &self.transform;
        [t.a, t.d, t.b, t.e, t.c, t.f]
    }

    /// Map coordinates of a (fractional) pixel position.
    pub fn pixel_to_geo(&self, column: f64, row: f64) -> GeoPoint {
        let (x, y) = self.transform.apply(column, row);
        GeoPoint::new(x, y)
    }

    /// Fractional pixel position of a map coordinate, `None` if singular.
    pub fn geo_to_pixel(&self, p: GeoPoint) -> Option<(f64, f64)> {
        Some(self.transform.inverse()?.apply(p.x, p.y))
    }

    /// Six lines in sidecar order with `C, F` moved to the top-left pixel center.
    pub fn to_sidecar_string(&self) -> String {
        let t = &self.transform;
        let c = t.c + 0.5 * t.a + 0.5 * t.b;
        let f = t.f + 0.5 * t.d + 0.5 * t.e;
        [t.a, t.d, t.b, t.e, c, f]
            .iter()
            .map(|v| format!("{:.12}\n", v))
            .collect()
    }

    /// Parse sidecar text: six numbers, one per line, blank lines ignored.
    pub fn parse(text: &str) -> Result<Self, WorldFileError> {
        let values = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| {
                l.parse::<f64>()
                    .map_err(|_| WorldFileError::Parse(format!("'{}' is not a number", l)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let [a, d, b, e, c, f]: [f64; 6] = values
            .try_into()
            .map_err(|v: Vec<f64>| WorldFileError::Parse(format!("expected 6 values, found {}", v.len())))?;

        let transform = Affine::new(a, b, c - 0.5 * a - 0.5 * b, d, e, f - 0.5 * d - 0.5 * e);
        if !transform.is_finite() {
            return Err(WorldFileError::Parse("non-finite coefficient".to_string()));
        }
        Ok(Self::new(transform))
    }

    /// Write the sidecar next to `image_path`, returning the sidecar path.
    pub fn write_sidecar(&self, image_path: &Path) -> Result<PathBuf, WorldFileError> {
        let path = sidecar_path(image_path);
        fs::write(&path, self.to_sidecar_string())?;
        debug!(path = %path.display(), "wrote world file");
        Ok(path)
    }

    /// Read the sidecar belonging to `image_path`.
    pub fn read_sidecar(image_path: &Path) -> Result<Self, WorldFileError> {
        let path = sidecar_path(image_path);
        let text = fs::read_to_string(&path)?;
        Self::parse(&text)
    }
}

/// Sidecar path for an image: `.png -> .pgw`, `.jpg -> .jgw`, `.tif -> .tfw`,
/// otherwise first and last letter of the extension plus `w`, or `.wld`.
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let ext = image_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let world_ext = match ext.as_str() {
        "" => "wld".to_string(),
        "jpg" | "jpeg" => "jgw".to_string(),
        "png" => "pgw".to_string(),
        "tif" | "tiff" => "tfw".to_string(),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next_back()) {
                (Some(first), Some(last)) => format!("{}{}w", first, last),
                _ => "wld".to_string(),
            }
        }
    };

    image_path.with_extension(world_ext)
}

/// World file of the page raster for a map placed on `page`.
///
/// The map's extent fills its frame and is extrapolated to the whole page, the
/// page raster's pixel grid is applied, and the result is rotated by the map
/// rotation about the extent center. Fails rather than producing infinite or
/// NaN coefficients.
pub fn compute_world_file(page: &PageSetup, map: &MapFrame) -> Result<WorldFile, WorldFileError> {
    if !map.extent.is_valid() {
        return Err(WorldFileError::InvalidExtent(map.extent));
    }
    if !map.rect.is_valid() {
        return Err(WorldFileError::InvalidFrame { width: map.rect.width, height: map.rect.height });
    }
    if !page.is_valid() {
        return Err(WorldFileError::InvalidPage {
            width_mm: page.width_mm,
            height_mm: page.height_mm,
            dpi: page.dpi,
        });
    }

    let transform = map.pixel_to_geo(page);
    if !transform.is_finite() || !map.rotation.is_finite() {
        return Err(WorldFileError::InvalidExtent(map.extent));
    }
    Ok(WorldFile::new(transform))
}
