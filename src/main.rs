use colored::*;
use std::process;
use trun::TrunError;

fn main() {
    if let Err(e) = trun::cli::run() {
        eprintln!("{} {}", "error:".red().bold(), e);

        let code = e
            .downcast_ref::<TrunError>()
            .map_or(1, TrunError::exit_code);
        process::exit(code);
    }
}
