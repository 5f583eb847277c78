//! Comparing rendered pages against expected images
//!
//! [`PixelComparator`] counts mismatching pixels and draws a diff image.
//! [`CompositionChecker`] renders a composition and checks the result against
//! a control image stored as `<control_dir>/expected_<name>/expected_<name>.png`,
//! writing the rendered page and the diff into a report directory.

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::composition::Composition;
use crate::layer::LayerSet;
use crate::output::{load_image, save_png, OutputError};
use crate::render::{RenderError, Renderer};

/// Environment variable overriding the control image directory.
pub const CONTROL_IMAGES_ENV: &str = "MAPC_CONTROL_IMAGES";

/// Control image directory used when [`CONTROL_IMAGES_ENV`] is unset.
pub const DEFAULT_CONTROL_DIR: &str = "tests/testdata/control_images";

const MISMATCH_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Error type for composition checks
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Failed to render '{name}': {source}")]
    Render { name: String, source: RenderError },
    #[error("Missing control image {}", .0.display())]
    MissingControl(PathBuf),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Result of comparing two images.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Pixels differing by more than the tolerance
    pub mismatched: u64,
    pub total: u64,
    /// Set when the images have different sizes
    pub dimension_mismatch: Option<((u32, u32), (u32, u32))>,
    /// Mismatching pixels in red over a faded copy of the expected image
    pub diff: Option<RgbaImage>,
    pub passed: bool,
}

impl Comparison {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        if let Some(((rw, rh), (ew, eh))) = self.dimension_mismatch {
            return format!("size mismatch: rendered {}x{}, expected {}x{}", rw, rh, ew, eh);
        }
        let verdict = if self.passed { "match" } else { "mismatch" };
        format!("{}: {} of {} pixels differ", verdict, self.mismatched, self.total)
    }
}

/// Decides whether a rendered image matches an expected one.
pub trait ImageComparator {
    fn compare(&self, rendered: &RgbaImage, expected: &RgbaImage) -> Comparison;
}

/// Per-pixel comparison with a channel tolerance and a mismatch allowance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelComparator {
    /// Largest per-channel difference still counted as equal
    pub color_tolerance: u8,
    /// Number of mismatching pixels still accepted
    pub allowed_mismatch: u64,
}

impl PixelComparator {
    pub fn new(color_tolerance: u8, allowed_mismatch: u64) -> Self {
        Self { color_tolerance, allowed_mismatch }
    }

    fn pixels_match(&self, a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
        a.0.iter().zip(b.0.iter()).all(|(x, y)| x.abs_diff(*y) <= self.color_tolerance)
    }
}

impl ImageComparator for PixelComparator {
    fn compare(&self, rendered: &RgbaImage, expected: &RgbaImage) -> Comparison {
        if rendered.dimensions() != expected.dimensions() {
            return Comparison {
                mismatched: 0,
                total: u64::from(expected.width()) * u64::from(expected.height()),
                dimension_mismatch: Some((rendered.dimensions(), expected.dimensions())),
                diff: None,
                passed: false,
            };
        }

        let mut diff = RgbaImage::new(expected.width(), expected.height());
        let mut mismatched = 0u64;
        for ((r, e), d) in rendered.pixels().zip(expected.pixels()).zip(diff.pixels_mut()) {
            if self.pixels_match(r, e) {
                *d = faded(e);
            } else {
                mismatched += 1;
                *d = MISMATCH_COLOR;
            }
        }

        Comparison {
            mismatched,
            total: u64::from(expected.width()) * u64::from(expected.height()),
            dimension_mismatch: None,
            diff: Some(diff),
            passed: mismatched <= self.allowed_mismatch,
        }
    }
}

/// Washed-out grey version of a pixel, so mismatches stand out.
fn faded(p: &Rgba<u8>) -> Rgba<u8> {
    let luma = (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32).round() as u8;
    let v = 255 - (255 - luma) / 4;
    Rgba([v, v, v, 255])
}

/// Outcome of checking one composition.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub message: String,
    pub mismatched: u64,
}

/// Control image directory from [`CONTROL_IMAGES_ENV`], else [`DEFAULT_CONTROL_DIR`].
pub fn control_images_dir() -> PathBuf {
    std::env::var_os(CONTROL_IMAGES_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTROL_DIR))
}

/// Renders a composition and compares it with its control image.
#[derive(Debug, Clone)]
pub struct CompositionChecker {
    pub name: String,
    pub control_dir: PathBuf,
    pub report_dir: PathBuf,
    pub comparator: PixelComparator,
}

impl CompositionChecker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            control_dir: control_images_dir(),
            report_dir: std::env::temp_dir(),
            comparator: PixelComparator::default(),
        }
    }

    pub fn with_control_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.control_dir = dir.into();
        self
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn with_comparator(mut self, comparator: PixelComparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// `<control_dir>/expected_<name>/expected_<name>.png`
    pub fn control_image_path(&self) -> PathBuf {
        let expected = format!("expected_{}", self.name);
        self.control_dir.join(&expected).join(format!("{}.png", expected))
    }

    pub fn rendered_path(&self) -> PathBuf {
        self.report_dir.join(format!("{}_rendered.png", self.name))
    }

    pub fn diff_path(&self) -> PathBuf {
        self.report_dir.join(format!("{}_diff.png", self.name))
    }

    /// Render `composition`, save it to the report directory and compare it.
    pub fn check(
        &self,
        renderer: &dyn Renderer,
        composition: &Composition,
        layers: &LayerSet,
    ) -> Result<CheckOutcome, CheckError> {
        let page = renderer
            .render(composition, layers)
            .map_err(|source| CheckError::Render { name: self.name.clone(), source })?;
        save_png(&page.image, &self.rendered_path())?;
        self.check_image(&page.image)
    }

    /// Compare an already rendered image with the control image.
    pub fn check_image(&self, rendered: &RgbaImage) -> Result<CheckOutcome, CheckError> {
        let control = self.control_image_path();
        if !control.exists() {
            return Err(CheckError::MissingControl(control));
        }
        let expected = load_image(&control)?;
        let comparison = self.comparator.compare(rendered, &expected);
        debug!(name = %self.name, mismatched = comparison.mismatched, "compared with control image");

        if let Some(diff) = &comparison.diff {
            if !comparison.passed {
                save_png(diff, &self.diff_path())?;
                info!(name = %self.name, diff = %self.diff_path().display(), "wrote diff image");
            }
        }

        Ok(CheckOutcome {
            passed: comparison.passed,
            message: format!("{}: {}", self.name, comparison.summary()),
            mismatched: comparison.mismatched,
        })
    }
}

/// Check against an explicit control image file rather than a control directory.
pub fn compare_files(
    comparator: &dyn ImageComparator,
    rendered: &Path,
    expected: &Path,
) -> Result<Comparison, OutputError> {
    let rendered = load_image(rendered)?;
    let expected = load_image(expected)?;
    Ok(comparator.compare(&rendered, &expected))
}
