//! Check command implementation: render compositions in parallel and compare
//! them with their control images

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rayon::prelude::*;

use crate::compare::{CheckError, CheckOutcome, CompositionChecker, PixelComparator};
use crate::config::{load_composition, LoadedComposition};
use crate::render::RasterRenderer;

use super::{find_composition_files, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the check command
pub fn run_check(
    target: &str,
    control_dir: Option<PathBuf>,
    report_dir: Option<PathBuf>,
    tolerance: u8,
    allowed: u64,
) -> ExitCode {
    let files = match find_composition_files(target) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    if files.is_empty() {
        eprintln!("Error: No compositions found for '{}'", target);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let comparator = PixelComparator::new(tolerance, allowed);
    let loaded: Vec<(PathBuf, Result<LoadedComposition, String>)> = files
        .par_iter()
        .map(|path| (path.clone(), load_composition(path).map_err(|e| e.to_string())))
        .collect();

    // report files are named after the composition, so names must be unique
    let shared = shared_names(
        loaded.iter().filter_map(|(path, l)| l.as_ref().ok().map(|l| (path.as_path(), l.composition.name.as_str()))),
    );

    let results: Vec<(&PathBuf, Result<CheckOutcome, String>)> = loaded
        .par_iter()
        .map(|(path, loaded)| {
            let result = match loaded {
                Err(e) => Err(e.clone()),
                Ok(l) => match shared.get(l.composition.name.as_str()) {
                    Some(paths) => Err(format!(
                        "composition name '{}' is shared by {}",
                        l.composition.name,
                        paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
                    )),
                    None => check_loaded(l, control_dir.as_deref(), report_dir.as_deref(), comparator),
                },
            };
            (path, result)
        })
        .collect();

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(outcome) if outcome.passed => println!("ok   {}", outcome.message),
            Ok(outcome) => {
                failed += 1;
                println!("FAIL {}", outcome.message);
            }
            Err(e) => {
                failed += 1;
                println!("ERR  {}: {}", path.display(), e);
            }
        }
    }
    println!("{} checked, {} passed, {} failed", results.len(), results.len() - failed, failed);

    if failed == 0 {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// Composition names used by more than one file, with the files using them
fn shared_names<'a>(entries: impl Iterator<Item = (&'a Path, &'a str)>) -> HashMap<&'a str, Vec<&'a Path>> {
    let mut by_name: HashMap<&str, Vec<&Path>> = HashMap::new();
    for (path, name) in entries {
        by_name.entry(name).or_default().push(path);
    }
    by_name.retain(|_, paths| paths.len() > 1);
    by_name
}

fn check_loaded(
    loaded: &LoadedComposition,
    control_dir: Option<&Path>,
    report_dir: Option<&Path>,
    comparator: PixelComparator,
) -> Result<CheckOutcome, String> {
    let mut checker = CompositionChecker::new(&loaded.composition.name).with_comparator(comparator);
    if let Some(dir) = control_dir {
        checker = checker.with_control_dir(dir);
    }
    if let Some(dir) = report_dir {
        checker = checker.with_report_dir(dir);
    }
    checker
        .check(&RasterRenderer::new(), &loaded.composition, &loaded.layers)
        .map_err(|e: CheckError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_names() {
        let entries = [
            (Path::new("a/coast.toml"), "coast"),
            (Path::new("b/coast.toml"), "coast"),
            (Path::new("lake.toml"), "lake"),
        ];
        let shared = shared_names(entries.into_iter());
        assert_eq!(shared.len(), 1);
        assert_eq!(shared["coast"], vec![Path::new("a/coast.toml"), Path::new("b/coast.toml")]);
        assert!(!shared.contains_key("lake"));
    }
}
