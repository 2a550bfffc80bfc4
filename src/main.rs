//! poolwire - cache pool wiring for dependency-injection containers

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = poolwire::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
