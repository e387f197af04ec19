use crate::ssa::Instruction;
use crate::verification::smt_codegen::{encode_equivalence, encode_verification, SmtScript};
use crate::verification::solver::{Model, Solver, SolverError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    NotVerified,
    Equivalent,
    NotEquivalent,
}

impl Verdict {
    pub fn is_positive(self) -> bool {
        matches!(self, Verdict::Verified | Verdict::Equivalent)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Verified => write!(f, "Verified"),
            Verdict::NotVerified => write!(f, "Not verified"),
            Verdict::Equivalent => write!(f, "Equivalent"),
            Verdict::NotEquivalent => write!(f, "Not equivalent"),
        }
    }
}

/// Why a query came back negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Unsatisfiable,
    OutputCountMismatch { first: usize, second: usize },
    SolverFailure(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unsatisfiable => {
                write!(f, "constraints are unsatisfiable together with the goal")
            }
            Diagnostic::OutputCountMismatch { first, second } => write!(
                f,
                "programs expose a different number of outputs ({} vs {})",
                first, second
            ),
            Diagnostic::SolverFailure(msg) => write!(f, "solver failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub verdict: Verdict,
    /// Satisfying assignment for positive verdicts.
    pub model: Option<Model>,
    pub diagnostic: Option<Diagnostic>,
    pub script: SmtScript,
    /// Where the script was written, when saving is enabled.
    pub saved_to: Option<PathBuf>,
}

/// Encodes a query, hands it to a [`Solver`] and turns the answer into a
/// [`Verdict`]. Solver failures never escape: they become negative verdicts.
pub struct AutoVerifier {
    solver: Box<dyn Solver>,
    output_dir: Option<PathBuf>,
}

impl AutoVerifier {
    pub fn new(solver: Box<dyn Solver>) -> Self {
        Self {
            solver,
            output_dir: None,
        }
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = Some(output_dir.as_ref().to_path_buf());
        self
    }

    pub fn solver_name(&self) -> String {
        self.solver.name()
    }

    /// Satisfiable means the assertions are consistent with the program.
    pub fn verify_program(
        &self,
        instructions: &[Instruction],
        unroll_depth: u32,
    ) -> Result<VerificationReport, VerificationError> {
        let script = encode_verification(instructions, unroll_depth);
        let saved_to = self.save_script(&script, "verify", "assertion check")?;
        Ok(self.decide(script, saved_to, Verdict::Verified, Verdict::NotVerified))
    }

    /// Satisfiable means both programs can agree on every output.
    pub fn check_equivalence(
        &self,
        first: &[Instruction],
        second: &[Instruction],
        unroll_depth: u32,
    ) -> Result<VerificationReport, VerificationError> {
        let script = encode_equivalence(first, second, unroll_depth);
        let saved_to = self.save_script(&script, "equiv", "equivalence check")?;

        if let Some(mismatch) = script.output_mismatch {
            return Ok(VerificationReport {
                verdict: Verdict::NotEquivalent,
                model: None,
                diagnostic: Some(Diagnostic::OutputCountMismatch {
                    first: mismatch.first,
                    second: mismatch.second,
                }),
                script,
                saved_to,
            });
        }

        Ok(self.decide(script, saved_to, Verdict::Equivalent, Verdict::NotEquivalent))
    }

    fn decide(
        &self,
        script: SmtScript,
        saved_to: Option<PathBuf>,
        positive: Verdict,
        negative: Verdict,
    ) -> VerificationReport {
        let (verdict, model, diagnostic) = match self.solver.solve(&script.to_string()) {
            Ok(response) if response.satisfiable => (positive, response.model, None),
            Ok(_) => (negative, None, Some(Diagnostic::Unsatisfiable)),
            Err(e) => (negative, None, Some(solver_failure(&e))),
        };

        VerificationReport {
            verdict,
            model,
            diagnostic,
            script,
            saved_to,
        }
    }

    /// Writes the script with a comment header into the output directory.
    fn save_script(
        &self,
        script: &SmtScript,
        prefix: &str,
        description: &str,
    ) -> Result<Option<PathBuf>, VerificationError> {
        let Some(output_dir) = &self.output_dir else {
            return Ok(None);
        };

        fs::create_dir_all(output_dir).map_err(|e| {
            VerificationError::IoError(format!("Failed to create output directory: {}", e))
        })?;

        let now = chrono::Utc::now();
        let filename = format!("{}_{}.smt2", prefix, now.format("%Y%m%d_%H%M%S_%3f"));
        let file_path = output_dir.join(filename);

        let mut content = String::new();
        content.push_str(&format!("; {}\n", description));
        content.push_str(&format!("; Logic: {}\n", script.logic));
        content.push_str(&format!(
            "; Declarations: {}, assertions: {}\n",
            script.declarations.len(),
            script.assertion_count()
        ));
        content.push_str(&format!(
            "; Generated at: {}\n",
            now.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        content.push_str(";\n\n");
        content.push_str(&script.to_string());

        fs::write(&file_path, content).map_err(|e| {
            VerificationError::IoError(format!(
                "Failed to write script {}: {}",
                file_path.display(),
                e
            ))
        })?;

        Ok(Some(file_path))
    }
}

fn solver_failure(error: &SolverError) -> Diagnostic {
    Diagnostic::SolverFailure(error.to_string())
}

#[derive(Debug)]
pub enum VerificationError {
    IoError(String),
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VerificationError::IoError(msg) => write!(f, "IO Error: {}", msg),
        }
    }
}

impl std::error::Error for VerificationError {}
