//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod check;
mod compare;
mod render;
mod worldfile;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Check if a path looks like a composition document (.toml).
pub fn is_composition_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("toml"))
}

/// Composition documents named by `target`: every `.toml` file below a
/// directory, or the files matching a glob pattern. Sorted for stable output.
pub fn find_composition_files(target: &str) -> Result<Vec<PathBuf>, String> {
    let pattern = if Path::new(target).is_dir() {
        format!("{}/**/*.toml", target.trim_end_matches('/'))
    } else {
        target.to_string()
    };

    let paths = glob(&pattern).map_err(|e| format!("Invalid pattern '{}': {}", pattern, e))?;
    let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| is_composition_file(p)).collect();
    files.sort();
    Ok(files)
}

/// mapc - Georeferenced print compositions
#[derive(Parser)]
#[command(name = "mapc")]
#[command(about = "mapc - Render map compositions and compute world files for the exported pages")]
#[command(version)]
pub struct Cli {
    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a composition to PNG, with a world file when it asks for one
    Render {
        /// Composition document (.toml)
        input: PathBuf,

        /// Output file or directory.
        /// If omitted: {input}.png next to the input
        /// If directory (ends with /): dir/{input}.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Strict mode: treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Do not write the world file sidecar
        #[arg(long)]
        no_world_file: bool,
    },

    /// Print the world file parameters of a composition's page raster
    Worldfile {
        /// Composition document (.toml)
        input: PathBuf,

        /// Georeference from this map instead of the composition's world file map
        #[arg(long)]
        map: Option<String>,

        /// Print a JSON object instead of world file lines
        #[arg(long)]
        json: bool,
    },

    /// Compare a rendered image with an expected image
    Compare {
        /// Rendered image
        rendered: PathBuf,

        /// Expected image
        expected: PathBuf,

        /// Largest per-channel difference counted as equal
        #[arg(long, default_value = "0")]
        tolerance: u8,

        /// Number of mismatching pixels still accepted
        #[arg(long, default_value = "0")]
        allowed: u64,

        /// Write a diff image here
        #[arg(long)]
        diff: Option<PathBuf>,
    },

    /// Render compositions and check them against control images
    Check {
        /// Directory of compositions or a glob pattern
        target: String,

        /// Control image directory (default: $MAPC_CONTROL_IMAGES or tests/testdata/control_images)
        #[arg(long)]
        control_dir: Option<PathBuf>,

        /// Where rendered pages and diffs are written (default: system temp dir)
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Largest per-channel difference counted as equal
        #[arg(long, default_value = "0")]
        tolerance: u8,

        /// Number of mismatching pixels still accepted
        #[arg(long, default_value = "0")]
        allowed: u64,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
        Err(_) => tracing_subscriber::EnvFilter::new(if verbose { "mapcomposer=debug" } else { "warn" }),
    };
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render { input, output, strict, no_world_file } => {
            render::run_render(&input, output.as_deref(), strict, no_world_file)
        }
        Commands::Worldfile { input, map, json } => worldfile::run_worldfile(&input, map.as_deref(), json),
        Commands::Compare { rendered, expected, tolerance, allowed, diff } => {
            compare::run_compare(&rendered, &expected, tolerance, allowed, diff.as_deref())
        }
        Commands::Check { target, control_dir, report_dir, tolerance, allowed } => {
            check::run_check(&target, control_dir, report_dir, tolerance, allowed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_composition_file() {
        assert!(is_composition_file(Path::new("maps/landsat.toml")));
        assert!(!is_composition_file(Path::new("landsat.png")));
        assert!(!is_composition_file(Path::new("toml")));
    }

    #[test]
    fn test_find_composition_files_in_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("b.toml"), "").unwrap();
        fs::write(temp.path().join("nested/a.toml"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        let files = find_composition_files(&temp.path().display().to_string()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_composition_file(f)));
    }

    #[test]
    fn test_find_composition_files_with_glob() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("one.toml"), "").unwrap();
        fs::write(temp.path().join("two.toml"), "").unwrap();
        let pattern = format!("{}/o*.toml", temp.path().display());
        assert_eq!(find_composition_files(&pattern).unwrap(), vec![temp.path().join("one.toml")]);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["mapc", "-v", "worldfile", "page.toml", "--map", "main", "--json"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Worldfile { map, json, .. } => {
                assert_eq!(map.as_deref(), Some("main"));
                assert!(json);
            }
            _ => panic!("expected worldfile command"),
        }

        assert!(Cli::try_parse_from(["mapc", "compare", "a.png"]).is_err());
    }
}
