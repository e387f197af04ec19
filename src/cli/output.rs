// src/cli/output.rs
use super::{Cli, FileOutput};
use crate::ast::{format_error, SpannedError};
use std::fs;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct OutputManager;

impl OutputManager {
    /// stdout, or a freshly created file when `-o` was given
    pub fn get_file_writer(output_path: &Option<PathBuf>) -> Result<BufWriter<Box<dyn Write>>, String> {
        match output_path {
            Some(path) => {
                let file = fs::File::create(path)
                    .map_err(|e| format!("Failed to create file {:?}: {}", path, e))?;
                Ok(BufWriter::new(Box::new(file)))
            }
            None => Ok(BufWriter::new(Box::new(stdout()))),
        }
    }

    /// Handle file output for a stage
    pub fn handle_file_output<T, S>(stage: &S, data: &T, cli: &Cli) -> Result<(), String>
    where
        S: FileOutput<Data = T>,
    {
        let mut writer = Self::get_file_writer(&cli.output)?;
        stage.write_output(data, &mut writer, cli)?;
        writer
            .flush()
            .map_err(|e| format!("Failed to flush output: {}", e))?;
        Ok(())
    }

    pub fn read_source(path: &Path) -> Result<String, String> {
        fs::read_to_string(path).map_err(|e| format!("Failed to read file {:?}: {}", path, e))
    }
}

/// Prints a parse or conversion error with the offending source line.
pub fn print_spanned_error(error: &SpannedError, source_code: &str) {
    eprintln!("{}", format_error(error, source_code));
}
