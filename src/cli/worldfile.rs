//! Worldfile command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::load_composition;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the worldfile command
pub fn run_worldfile(input: &Path, map: Option<&str>, json: bool) -> ExitCode {
    let mut loaded = match load_composition(input) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}: {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let composition = &mut loaded.composition;

    if let Some(id) = map {
        if composition.map(id).is_none() {
            let known: Vec<&str> = composition.maps.iter().map(|m| m.id.as_str()).collect();
            eprintln!("Error: No map '{}' in composition (maps: {})", id, known.join(", "));
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        composition.world_file.map = Some(id.to_string());
    }

    let world_file = match composition.compute_world_file_parameters() {
        Ok(world_file) => world_file,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        let [a, b, c, d, e, f] = world_file.coefficients();
        let value = serde_json::json!({
            "composition": composition.name,
            "map": composition.world_file.map,
            "width": composition.page.pixel_width(),
            "height": composition.page.pixel_height(),
            "a": a,
            "b": b,
            "c": c,
            "d": d,
            "e": e,
            "f": f,
        });
        match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        print!("{}", world_file.to_sidecar_string());
    }

    ExitCode::from(EXIT_SUCCESS)
}
