//! mapc - Command-line tool for rendering georeferenced map compositions

use std::process::ExitCode;

use mapcomposer::cli;

fn main() -> ExitCode {
    cli::run()
}
