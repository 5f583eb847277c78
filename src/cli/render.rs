//! Render command implementation

use std::path::Path;
use std::process::ExitCode;

use tracing::info;

use crate::config::load_composition;
use crate::output::{export_page, generate_output_path};
use crate::render::{RasterRenderer, Renderer};

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Execute the render command
pub fn run_render(input: &Path, output: Option<&Path>, strict: bool, no_world_file: bool) -> ExitCode {
    let mut loaded = match load_composition(input) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}: {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if no_world_file {
        loaded.composition.world_file.generate = false;
    }

    let renderer = RasterRenderer::new().strict(strict);
    let page = match renderer.render(&loaded.composition, &loaded.layers) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    for warning in &page.warnings {
        eprintln!("Warning: {}", warning);
    }
    if strict && !page.warnings.is_empty() {
        eprintln!("Error: {} warning(s) in strict mode", page.warnings.len());
        return ExitCode::from(EXIT_ERROR);
    }

    let output_path = generate_output_path(input, output);
    match export_page(&page, &output_path) {
        Ok(sidecar) => {
            println!("Saved: {}", output_path.display());
            if let Some(sidecar) = sidecar {
                println!("Saved: {}", sidecar.display());
            }
            info!(
                composition = %loaded.composition.name,
                width = page.image.width(),
                height = page.image.height(),
                "rendered composition"
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: Failed to save '{}': {}", output_path.display(), e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
