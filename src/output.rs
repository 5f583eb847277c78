//! PNG output, world-file sidecars and file path generation

use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::render::RenderedPage;
use crate::worldfile::WorldFileError;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// Writing the world-file sidecar failed
    #[error("World file error: {0}")]
    WorldFile(#[from] WorldFileError),
}

/// Save an RGBA image to a PNG file, creating parent directories as needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Load an image file as RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, OutputError> {
    Ok(image::open(path)?.to_rgba8())
}

/// Write a rendered page and, if it carries one, its world-file sidecar.
///
/// Returns the sidecar path when one was written.
pub fn export_page(page: &RenderedPage, path: &Path) -> Result<Option<PathBuf>, OutputError> {
    save_png(&page.image, path)?;
    match &page.world_file {
        Some(world_file) => Ok(Some(world_file.write_sidecar(path)?)),
        None => Ok(None),
    }
}

/// Generate the output path for a rendered composition.
///
/// | Scenario | Output |
/// |----------|--------|
/// | No `-o` | `<input stem>.png` next to the input |
/// | `-o page.png` | `page.png` |
/// | `-o dir/` | `dir/<input stem>.png` |
pub fn generate_output_path(input: &Path, output_arg: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    match output_arg {
        Some(output) => {
            let is_dir = output.as_os_str().to_string_lossy().ends_with('/') || output.is_dir();
            if is_dir {
                output.join(format!("{}.png", stem))
            } else {
                output.to_path_buf()
            }
        }
        None => input.with_file_name(format!("{}.png", stem)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affine::Affine;
    use crate::worldfile::WorldFile;
    use image::Rgba;
    use tempfile::tempdir;

    #[test]
    fn test_generate_output_path_default() {
        assert_eq!(generate_output_path(Path::new("landsat.toml"), None), PathBuf::from("landsat.png"));
        assert_eq!(
            generate_output_path(Path::new("maps/landsat.toml"), None),
            PathBuf::from("maps/landsat.png")
        );
    }

    #[test]
    fn test_generate_output_path_explicit_file() {
        let path = generate_output_path(Path::new("landsat.toml"), Some(Path::new("build/page.png")));
        assert_eq!(path, PathBuf::from("build/page.png"));
    }

    #[test]
    fn test_generate_output_path_directory() {
        let path = generate_output_path(Path::new("maps/landsat.toml"), Some(Path::new("out/")));
        assert_eq!(path, PathBuf::from("out/landsat.png"));
    }

    #[test]
    fn test_save_png_round_trip_pixels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dirs/test.png");

        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 0]));

        save_png(&image, &path).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_export_page_writes_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.png");
        let page = RenderedPage {
            image: RgbaImage::new(4, 4),
            world_file: Some(WorldFile::new(Affine::new(2.0, 0.0, 100.0, 0.0, -2.0, 200.0))),
            warnings: Vec::new(),
        };

        let sidecar = export_page(&page, &path).unwrap().unwrap();
        assert_eq!(sidecar, dir.path().join("page.pgw"));
        assert!(path.exists());
        let read = WorldFile::read_sidecar(&path).unwrap();
        assert!((read.coefficients()[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_export_page_without_world_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.png");
        let page = RenderedPage { image: RgbaImage::new(1, 1), world_file: None, warnings: Vec::new() };
        assert_eq!(export_page(&page, &path).unwrap(), None);
        assert!(!dir.path().join("page.pgw").exists());
    }

    #[test]
    fn test_load_missing_image_fails() {
        assert!(load_image(Path::new("/nonexistent/none.png")).is_err());
    }
}
