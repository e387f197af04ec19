// src/cli/mod.rs
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

mod logger;
mod output;
mod pipeline;
mod stages;
mod traits;

pub use logger::*;
pub use output::*;
pub use pipeline::*;
pub use stages::*;
pub use traits::*;

const DEFAULT_TIMEOUT: u32 = 30;
const DEFAULT_SOLVER: &str = "z3";

#[derive(Parser, Debug)]
#[command(name = "progcheck")]
#[command(about = "Assertion and equivalence checking for small imperative programs")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Input source file
    pub input: PathBuf,

    /// Second program to compare against (smt and equiv modes)
    #[arg(long = "against")]
    pub against: Option<PathBuf>,

    /// Processing mode - each mode includes all previous stages
    #[arg(short = 'm', long = "mode", default_value = "verify")]
    pub mode: Mode,

    /// Output file for the artifact of the selected stage
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Directory where solver scripts are saved (verify and equiv modes)
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// CFG output format (cfg mode only)
    #[arg(long = "format", default_value = "text")]
    pub format: OutputFormat,

    /// Loop unrolling depth handed to the encoder
    #[arg(long = "unroll", default_value = "1")]
    pub unroll: u32,

    /// Solver timeout in seconds (verify and equiv modes)
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT)]
    pub timeout: u32,

    /// Solver executable (verify and equiv modes)
    #[arg(long = "solver", default_value = DEFAULT_SOLVER)]
    pub solver: PathBuf,

    /// Skip optimization passes
    #[arg(long = "no-optimize")]
    pub no_optimize: bool,

    /// Encode the optimized instructions instead of the plain SSA form
    #[arg(long = "encode-optimized")]
    pub encode_optimized: bool,

    /// Show source spans in AST output
    #[arg(long = "show-spans")]
    pub show_spans: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet mode - minimal output
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Parse the program and print its syntax tree
    Ast,
    /// Convert to SSA form (includes AST stage)
    Ssa,
    /// Optimize the SSA instructions (includes AST + SSA stages)
    Optimize,
    /// Build the Control Flow Graph (includes AST + SSA + Optimize stages)
    Cfg,
    /// Print the SMT-LIB script (includes all stages before solving)
    Smt,
    /// Check the program's assertions with the solver
    Verify,
    /// Check that the program and --against agree on every output
    Equiv,
}

impl Mode {
    /// Number of stages a run in this mode goes through
    pub fn total_stages(self) -> usize {
        match self {
            Mode::Ast => 1,
            Mode::Ssa => 2,
            Mode::Optimize => 3,
            Mode::Cfg => 4,
            Mode::Smt => 5,
            Mode::Verify | Mode::Equiv => 6,
        }
    }

    pub fn runs_solver(self) -> bool {
        matches!(self, Mode::Verify | Mode::Equiv)
    }
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    Text,
    Dot,
    Json,
    Summary,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if self.quiet && self.verbose {
            return Err("Cannot use both --quiet and --verbose flags".to_string());
        }

        match (self.mode, &self.against) {
            (Mode::Equiv, None) => {
                return Err("equiv mode needs a second program: pass it with --against".to_string())
            }
            (Mode::Smt | Mode::Equiv, _) | (_, None) => {}
            (_, Some(_)) => return Err("--against is only valid for smt and equiv modes".to_string()),
        }

        if self.unroll < 1 {
            return Err("--unroll must be at least 1".to_string());
        }

        if self.format != OutputFormat::Text && self.mode != Mode::Cfg {
            return Err("--format is only valid for cfg mode".to_string());
        }

        if !self.mode.runs_solver() {
            if self.output_dir.is_some() {
                return Err("--output-dir is only valid for verify and equiv modes".to_string());
            }
            if self.timeout != DEFAULT_TIMEOUT {
                return Err("--timeout is only valid for verify and equiv modes".to_string());
            }
            if self.solver.as_os_str() != DEFAULT_SOLVER {
                return Err("--solver is only valid for verify and equiv modes".to_string());
            }
        }

        if self.no_optimize && matches!(self.mode, Mode::Ast | Mode::Ssa) {
            return Err("--no-optimize is only valid for modes that include optimization".to_string());
        }

        if self.encode_optimized {
            if !matches!(self.mode, Mode::Smt | Mode::Verify | Mode::Equiv) {
                return Err("--encode-optimized is only valid for smt, verify and equiv modes".to_string());
            }
            if self.no_optimize {
                return Err("Cannot use both --encode-optimized and --no-optimize".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["progcheck", "program.txt"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_verify_with_z3() {
        let cli = cli(&[]);
        assert_eq!(cli.mode, Mode::Verify);
        assert_eq!(cli.unroll, 1);
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.solver, PathBuf::from("z3"));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn equiv_requires_a_second_program() {
        assert!(cli(&["-m", "equiv"]).validate().is_err());
        assert!(cli(&["-m", "equiv", "--against", "other.txt"]).validate().is_ok());
        assert!(cli(&["-m", "smt", "--against", "other.txt"]).validate().is_ok());
        assert!(cli(&["-m", "ssa", "--against", "other.txt"]).validate().is_err());
    }

    #[test]
    fn rejects_flags_outside_their_modes() {
        assert!(cli(&["-m", "ast", "--format", "dot"]).validate().is_err());
        assert!(cli(&["-m", "cfg", "--format", "json"]).validate().is_ok());
        assert!(cli(&["-m", "cfg", "--timeout", "5"]).validate().is_err());
        assert!(cli(&["-m", "smt", "--output-dir", "out"]).validate().is_err());
        assert!(cli(&["-m", "ssa", "--no-optimize"]).validate().is_err());
        assert!(cli(&["--encode-optimized", "--no-optimize"]).validate().is_err());
        assert!(cli(&["-q", "-v"]).validate().is_err());
    }

    #[test]
    fn unroll_must_be_positive() {
        assert!(cli(&["--unroll", "0"]).validate().is_err());
        assert!(cli(&["--unroll", "4"]).validate().is_ok());
    }

    #[test]
    fn each_mode_includes_the_stages_before_it() {
        assert_eq!(Mode::Ast.total_stages(), 1);
        assert_eq!(Mode::Cfg.total_stages(), 4);
        assert_eq!(Mode::Equiv.total_stages(), 6);
        assert!(!Mode::Smt.runs_solver());
    }
}
