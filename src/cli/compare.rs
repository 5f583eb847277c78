//! Compare command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::compare::{compare_files, PixelComparator};
use crate::output::save_png;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Execute the compare command
pub fn run_compare(rendered: &Path, expected: &Path, tolerance: u8, allowed: u64, diff: Option<&Path>) -> ExitCode {
    let comparator = PixelComparator::new(tolerance, allowed);
    let comparison = match compare_files(&comparator, rendered, expected) {
        Ok(comparison) => comparison,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let (Some(path), Some(image)) = (diff, &comparison.diff) {
        if let Err(e) = save_png(image, path) {
            eprintln!("Error: Failed to write '{}': {}", path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    println!("{}", comparison.summary());
    if comparison.passed {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
