use std::process::ExitCode;

use colored::Colorize;

fn main() -> ExitCode {
    match clinical_reasoning_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
