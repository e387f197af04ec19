use crate::ssa::{format_ssa, Instruction, SsaProgram};
use std::io::{Result, Write};

#[derive(Debug, Clone, Default)]
pub struct SsaPrintOptions {
    /// Prefix every instruction with its position.
    pub numbered: bool,
    /// Append the final version of every base name.
    pub show_final_versions: bool,
}

pub fn print_ssa(program: &SsaProgram, options: &SsaPrintOptions, writer: &mut impl Write) -> Result<()> {
    print_instructions(&program.instructions, options, writer)?;

    if options.show_final_versions && !program.final_versions.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "; final versions")?;
        for (base, name) in &program.final_versions {
            writeln!(writer, ";   {} -> {}", base, name)?;
        }
    }
    Ok(())
}

pub fn print_instructions(
    instructions: &[Instruction],
    options: &SsaPrintOptions,
    writer: &mut impl Write,
) -> Result<()> {
    if !options.numbered {
        if !instructions.is_empty() {
            writeln!(writer, "{}", format_ssa(instructions))?;
        }
        return Ok(());
    }

    let width = instructions.len().to_string().len();
    for (idx, inst) in instructions.iter().enumerate() {
        writeln!(writer, "{:>width$}: {}", idx, inst, width = width)?;
    }
    Ok(())
}

/// `Defines: 2, Phis: 1, Asserts: 1`
pub fn ssa_summary(instructions: &[Instruction]) -> String {
    let (mut defines, mut phis, mut asserts) = (0, 0, 0);
    for inst in instructions {
        match inst {
            Instruction::Define { .. } => defines += 1,
            Instruction::Phi { .. } => phis += 1,
            Instruction::Assert { .. } => asserts += 1,
        }
    }
    format!("Defines: {}, Phis: {}, Asserts: {}", defines, phis, asserts)
}
