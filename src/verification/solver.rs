use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Satisfying assignment: versioned name → integer value.
pub type Model = BTreeMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverResponse {
    pub satisfiable: bool,
    pub model: Option<Model>,
}

impl SolverResponse {
    pub fn sat(model: Model) -> Self {
        Self {
            satisfiable: true,
            model: Some(model),
        }
    }

    pub fn unsat() -> Self {
        Self {
            satisfiable: false,
            model: None,
        }
    }
}

/// Anything that can decide an SMT-LIB 2 script.
pub trait Solver {
    fn solve(&self, script: &str) -> Result<SolverResponse, SolverError>;

    fn name(&self) -> String;
}

/// Runs `z3 -in -smt2` and feeds it the script on stdin.
#[derive(Debug, Clone)]
pub struct Z3ProcessSolver {
    program: PathBuf,
    timeout_seconds: u32,
}

impl Default for Z3ProcessSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Z3ProcessSolver {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("z3"),
            timeout_seconds: 30, // 30 second default timeout
        }
    }

    pub fn with_program<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.program = program.as_ref().to_path_buf();
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u32) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }
}

impl Solver for Z3ProcessSolver {
    fn solve(&self, script: &str) -> Result<SolverResponse, SolverError> {
        let mut child = Command::new(&self.program)
            .arg("-in")
            .arg("-smt2")
            .arg(format!("-T:{}", self.timeout_seconds)) // Set time limit
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SolverError::Spawn(format!("failed to execute {}: {}", self.program.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| SolverError::Io(format!("failed to write script to solver: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SolverError::Io(format!("failed to read solver output: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_solver_output(&stdout, &stderr, self.timeout_seconds)
    }

    fn name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Interprets what the solver printed for `(check-sat)` followed by `(get-model)`.
pub fn parse_solver_output(stdout: &str, stderr: &str, timeout_seconds: u32) -> Result<SolverResponse, SolverError> {
    let trimmed = stdout.trim_start();
    let first_line = trimmed.lines().next().unwrap_or("").trim();

    match first_line {
        "sat" => {
            let model = parse_model(&trimmed[first_line.len()..])?;
            Ok(SolverResponse::sat(model))
        }
        "unsat" => Ok(SolverResponse::unsat()),
        "unknown" => Err(SolverError::Unknown),
        "timeout" => Err(SolverError::Timeout(timeout_seconds)),
        "" => Err(SolverError::SolverOutput(format!(
            "solver produced no output{}",
            if stderr.trim().is_empty() {
                String::new()
            } else {
                format!(": {}", stderr.trim())
            }
        ))),
        line if line.starts_with("(error") => Err(SolverError::SolverOutput(line.to_string())),
        line => Err(SolverError::SolverOutput(format!("unexpected solver output: {}", line))),
    }
}

/// Reads the integer constants out of a `(get-model)` answer. Both the bare
/// `((define-fun ...) ...)` form and the older `(model (define-fun ...) ...)`
/// form are accepted; non-integer definitions are skipped.
pub fn parse_model(text: &str) -> Result<Model, SolverError> {
    let sexps = parse_sexps(text).map_err(|e| SolverError::SolverOutput(format!("malformed model: {}", e)))?;
    let mut model = Model::new();

    for sexp in &sexps {
        let Sexp::List(items) = sexp else {
            continue;
        };
        if let Some(Sexp::Atom(head)) = items.first() {
            if head == "error" {
                return Err(SolverError::SolverOutput(format!("solver error: {}", sexp)));
            }
        }
        for item in items {
            if let Some((name, value)) = integer_definition(item) {
                model.insert(name, value);
            }
        }
    }

    Ok(model)
}

/// `(define-fun name () Int value)` → `(name, value)`.
fn integer_definition(sexp: &Sexp) -> Option<(String, i64)> {
    match sexp {
        Sexp::List(items) => match items.as_slice() {
            [Sexp::Atom(keyword), Sexp::Atom(name), Sexp::List(params), Sexp::Atom(sort), value]
                if keyword == "define-fun" && params.is_empty() && sort == "Int" =>
            {
                Some((name.clone(), integer_value(value)?))
            }
            _ => None,
        },
        Sexp::Atom(_) => None,
    }
}

fn integer_value(sexp: &Sexp) -> Option<i64> {
    match sexp {
        Sexp::Atom(text) => text.parse().ok(),
        Sexp::List(items) => match items.as_slice() {
            [Sexp::Atom(minus), inner] if minus == "-" => integer_value(inner)?.checked_neg(),
            _ => None,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl std::fmt::Display for Sexp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sexp::Atom(text) => write!(f, "{}", text),
            Sexp::List(items) => {
                let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "({})", parts.join(" "))
            }
        }
    }
}

fn parse_sexps(text: &str) -> Result<Vec<Sexp>, String> {
    let mut stack: Vec<Vec<Sexp>> = vec![Vec::new()];
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '(' => stack.push(Vec::new()),
            ')' => {
                let list = stack.pop().ok_or("unbalanced `)`")?;
                stack
                    .last_mut()
                    .ok_or("unbalanced `)`")?
                    .push(Sexp::List(list));
            }
            c if c.is_whitespace() => {}
            '"' | '|' => {
                let mut atom = String::from(ch);
                let mut closed = false;
                for next in chars.by_ref() {
                    atom.push(next);
                    if next == ch {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err("unterminated quoted atom".to_string());
                }
                push_atom(&mut stack, atom)?;
            }
            _ => {
                let mut atom = String::from(ch);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '(' || next == ')' {
                        break;
                    }
                    atom.push(next);
                    chars.next();
                }
                push_atom(&mut stack, atom)?;
            }
        }
    }

    match stack.pop() {
        Some(top) if stack.is_empty() => Ok(top),
        _ => Err("unbalanced `(`".to_string()),
    }
}

fn push_atom(stack: &mut [Vec<Sexp>], atom: String) -> Result<(), String> {
    stack
        .last_mut()
        .ok_or_else(|| "unbalanced `)`".to_string())?
        .push(Sexp::Atom(atom));
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    Spawn(String),
    Io(String),
    Timeout(u32),
    Unknown,
    SolverOutput(String),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SolverError::Spawn(msg) => write!(f, "Spawn Error: {}", msg),
            SolverError::Io(msg) => write!(f, "IO Error: {}", msg),
            SolverError::Timeout(secs) => write!(f, "Solver timed out after {}s", secs),
            SolverError::Unknown => write!(f, "Solver returned unknown"),
            SolverError::SolverOutput(msg) => write!(f, "Solver Error: {}", msg),
        }
    }
}

impl std::error::Error for SolverError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sat_with_multiline_model() {
        let stdout = "sat\n(\n  (define-fun y_0 () Int\n    4)\n  (define-fun x_0 () Int\n    (- 3))\n)\n";
        let response = parse_solver_output(stdout, "", 30).unwrap();
        assert!(response.satisfiable);
        let model = response.model.unwrap();
        assert_eq!(model.get("x_0"), Some(&-3));
        assert_eq!(model.get("y_0"), Some(&4));
    }

    #[test]
    fn older_model_form_and_non_integer_entries() {
        let stdout = "sat\n(model\n  (define-fun a_0 () (Array Int Int)\n    ((as const (Array Int Int)) 0))\n  (define-fun i_0 () Int 7)\n)\n";
        let model = parse_solver_output(stdout, "", 30).unwrap().model.unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model["i_0"], 7);
    }

    #[test]
    fn unsat_ignores_the_model_error_that_follows() {
        let stdout = "unsat\n(error \"line 9 column 10: model is not available\")\n";
        assert_eq!(parse_solver_output(stdout, "", 30), Ok(SolverResponse::unsat()));
    }

    #[test]
    fn failures_are_reported_as_errors() {
        assert_eq!(parse_solver_output("unknown\n", "", 30), Err(SolverError::Unknown));
        assert_eq!(parse_solver_output("timeout\n", "", 5), Err(SolverError::Timeout(5)));
        assert!(matches!(
            parse_solver_output("(error \"line 1 column 1: unknown constant\")\n", "", 30),
            Err(SolverError::SolverOutput(_))
        ));
        assert!(matches!(
            parse_solver_output("", "segfault", 30),
            Err(SolverError::SolverOutput(msg)) if msg.contains("segfault")
        ));
    }

    #[test]
    fn missing_solver_binary_is_a_spawn_error() {
        let solver = Z3ProcessSolver::new().with_program("/nonexistent/progcheck-z3");
        assert!(matches!(solver.solve("(check-sat)\n"), Err(SolverError::Spawn(_))));
    }
}
