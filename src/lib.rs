pub mod ast;
pub mod cfg;
pub mod cli;
pub mod frontend;
pub mod optimization;
pub mod pretty;
pub mod ssa;
pub mod verification;

// Re-export
pub use ast::{format_error, AstError, Program, Results, SpannedError};
pub use cfg::{build_cfg, Cfg};
pub use frontend::{parse_expression, parse_program};
pub use optimization::optimize;
pub use ssa::{convert_to_ssa, format_ssa, Instruction, SsaProgram, VersionedName};
pub use verification::{encode_equivalence, encode_verification, AutoVerifier, SmtScript, Solver, Verdict};
