use std::process::ExitCode;

use clap::Parser;
use nifti_volume::{cli::Cli, telemetry::init_tracing};
use tracing::error;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match cli.run_program() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
