use clap::Parser;
use colored::*;

use progcheck::cli::{Cli, OutputManager, Pipeline};

fn main() {
    let cli = Cli::parse();

    // Handle no-color option using colored::control
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        eprintln!("{} {}", "ERROR:".red().bold(), e.bright_red());
        std::process::exit(1);
    }

    let source_code = match OutputManager::read_source(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{} {}", "ERROR:".red().bold(), e.bright_red());
            std::process::exit(1);
        }
    };

    // Create and execute pipeline
    let mut pipeline = Pipeline::new(&cli);
    match pipeline.execute(source_code, cli.mode, &cli) {
        // A negative verdict is a result, reported through the exit status.
        Ok(Some(verdict)) if !verdict.is_positive() => std::process::exit(2),
        Ok(_) => {}
        Err(e) => {
            eprintln!(
                "{} Pipeline execution failed: {}",
                "ERROR:".red().bold(),
                e.bright_red()
            );
            std::process::exit(1);
        }
    }
}
