// src/cli/traits.rs
use std::io::Write;

/// Core trait for all pipeline stages
pub trait PipelineStage {
    type Input;
    type Output;
    type Error;

    /// Execute this stage
    fn execute(&mut self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Get the name of this stage for logging
    fn name(&self) -> &'static str;

    /// Position in the full parse-to-solve run
    fn stage_number(&self) -> usize;
}

/// Trait for stages whose artifact can be printed
pub trait FileOutput {
    type Data;

    /// Write the stage's data to a writer
    fn write_output(
        &self,
        data: &Self::Data,
        writer: &mut dyn Write,
        cli: &super::Cli,
    ) -> Result<(), String>;
}

/// One-line statistics shown in verbose runs
pub trait StageSummary {
    type Data;

    fn get_summary(&self, data: &Self::Data) -> String;
}
