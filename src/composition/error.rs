//! Error types for composition validation and rendering

use thiserror::Error;

/// A warning generated during composition rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A structural problem in a composition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositionError {
    /// Paper size or resolution gives an empty or oversized page raster
    #[error("Invalid page: {width_mm}x{height_mm} mm at {dpi} dpi")]
    InvalidPage { width_mm: f64, height_mm: f64, dpi: f64 },
    /// Two maps share an id
    #[error("Duplicate map id '{0}'")]
    DuplicateMapId(String),
    /// A map id that no map in the composition carries
    #[error("Map '{0}' not found in composition")]
    UnknownMap(String),
    /// Map extent with zero or negative area
    #[error("Map '{map}' has an invalid extent ({xmin}, {ymin}, {xmax}, {ymax})")]
    InvalidExtent { map: String, xmin: f64, ymin: f64, xmax: f64, ymax: f64 },
    /// Map frame with non-positive size
    #[error("Map '{map}' has an invalid frame size {width}x{height} mm")]
    InvalidFrame { map: String, width: f64, height: f64 },
    /// Overview pointing at a missing map
    #[error("Overview of map '{map}' references unknown map '{source_map}'")]
    UnknownOverviewSource { map: String, source_map: String },
    /// Overview pointing at its own map
    #[error("Overview of map '{0}' references itself")]
    OverviewSelfReference(String),
    /// World file requested for a missing map
    #[error("World file map '{0}' not found in composition")]
    UnknownWorldFileMap(String),
}
