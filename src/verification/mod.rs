//! SMT-based checking of SSA programs.
//!
//! 1) [`smt_codegen`] turns instruction lists into an [`SmtScript`]
//! 2) a [`Solver`] decides the script (Z3 as a subprocess by default)
//! 3) [`AutoVerifier`] maps the answer to a [`Verdict`]

pub mod auto_verifier;
pub mod smt_codegen;
pub mod solver;

pub use auto_verifier::{AutoVerifier, Diagnostic, Verdict, VerificationError, VerificationReport};
pub use smt_codegen::{
    encode_equivalence, encode_verification, output_variables, Declaration, OutputMismatch, SmtScript, SmtSort,
};
pub use solver::{parse_model, parse_solver_output, Model, Solver, SolverError, SolverResponse, Z3ProcessSolver};
