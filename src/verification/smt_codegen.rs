//! SMT-LIB 2 generation from SSA instruction lists.
//!
//! Program semantics become equalities over versioned integer constants; the
//! property to check (assertions, or output equalities for equivalence) is
//! appended after them. Integer-valued and Boolean-valued subterms are kept
//! apart and coerced where one is used in place of the other.

use std::collections::HashSet;
use std::fmt;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::ssa::{mark_names, Instruction, SsaExpr, VersionedName, SECOND_PROGRAM_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtSort {
    Int,
    IntArray,
}

impl fmt::Display for SmtSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtSort::Int => write!(f, "Int"),
            SmtSort::IntArray => write!(f, "(Array Int Int)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub sort: SmtSort,
}

/// Recorded when two programs expose a different number of outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputMismatch {
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtScript {
    pub logic: &'static str,
    pub declarations: Vec<Declaration>,
    /// Program semantics, one `(assert ...)` line each.
    pub constraints: Vec<String>,
    /// The property under check, emitted after every constraint.
    pub goals: Vec<String>,
    pub output_mismatch: Option<OutputMismatch>,
}

impl SmtScript {
    pub fn assertion_count(&self) -> usize {
        self.constraints.len() + self.goals.len()
    }
}

impl fmt::Display for SmtScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "(set-logic {})", self.logic)?;
        for decl in &self.declarations {
            writeln!(f, "(declare-const {} {})", decl.name, decl.sort)?;
        }
        for line in self.constraints.iter().chain(&self.goals) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f, "(check-sat)")?;
        writeln!(f, "(get-model)")
    }
}

/// Checks the program's assertions. `_unroll_depth` is part of the interface
/// but loops are encoded by their phis alone.
pub fn encode_verification(instructions: &[Instruction], _unroll_depth: u32) -> SmtScript {
    let mut encoder = Encoder::default();
    encoder.encode_program(instructions);
    let constraints = std::mem::take(&mut encoder.constraints);
    let goals = std::mem::take(&mut encoder.goals);
    encoder.finish(constraints, goals, None)
}

/// Asks whether both programs can agree on every output. Names of `second`
/// are marked so the two programs share no constants.
pub fn encode_equivalence(first: &[Instruction], second: &[Instruction], _unroll_depth: u32) -> SmtScript {
    let second = mark_names(second, SECOND_PROGRAM_MARKER);
    let mut encoder = Encoder::default();

    let mut constraints = Vec::new();
    for program in [first, second.as_slice()] {
        encoder.encode_program(program);
        constraints.append(&mut encoder.constraints);
        constraints.append(&mut encoder.goals);
    }

    let outputs_first = output_variables(first);
    let outputs_second = output_variables(&second);

    let (goals, mismatch) = if outputs_first.len() == outputs_second.len() {
        let goals = outputs_first
            .iter()
            .zip(&outputs_second)
            .map(|(a, b)| format!("(assert (= {} {}))", a, b))
            .collect();
        (goals, None)
    } else {
        let mismatch = OutputMismatch {
            first: outputs_first.len(),
            second: outputs_second.len(),
        };
        (vec!["(assert false) ; output count mismatch".to_string()], Some(mismatch))
    };

    encoder.finish(constraints, goals, mismatch)
}

/// The last `Define` target of every base name, bases in first-definition order.
pub fn output_variables(instructions: &[Instruction]) -> Vec<&VersionedName> {
    let mut outputs: Vec<&VersionedName> = Vec::new();
    for inst in instructions {
        if let Instruction::Define { target, .. } = inst {
            match outputs.iter_mut().find(|out| out.base == target.base) {
                Some(slot) => *slot = target,
                None => outputs.push(target),
            }
        }
    }
    outputs
}

enum Term {
    Int(String),
    Bool(String),
}

#[derive(Default)]
struct Encoder {
    declarations: Vec<Declaration>,
    declared: HashSet<String>,
    constraints: Vec<String>,
    goals: Vec<String>,
    nonlinear: bool,
    arrays: bool,
}

impl Encoder {
    fn finish(self, constraints: Vec<String>, goals: Vec<String>, output_mismatch: Option<OutputMismatch>) -> SmtScript {
        let logic = match (self.nonlinear, self.arrays) {
            (false, false) => "QF_LIA",
            (true, false) => "QF_NIA",
            (false, true) => "QF_ALIA",
            (true, true) => "QF_AUFNIA",
        };
        SmtScript {
            logic,
            declarations: self.declarations,
            constraints,
            goals,
            output_mismatch,
        }
    }

    fn declare(&mut self, name: &VersionedName, sort: SmtSort) {
        let name = name.to_string();
        if self.declared.insert(name.clone()) {
            self.declarations.push(Declaration { name, sort });
        }
    }

    fn encode_program(&mut self, instructions: &[Instruction]) {
        for inst in instructions {
            self.encode_instruction(inst);
        }
    }

    fn encode_instruction(&mut self, inst: &Instruction) {
        match inst {
            Instruction::Define { target, value } => {
                self.declare(target, SmtSort::Int);
                let value = self.int_term(value);
                self.constraints.push(format!("(assert (= {} {}))", target, value));
            }
            Instruction::Phi {
                result,
                operands,
                guard,
            } => {
                self.declare(result, SmtSort::Int);
                for operand in operands {
                    self.declare(operand, SmtSort::Int);
                }
                // Loop-entry phis have no guard and stay unconstrained.
                if let (Some(guard), [then_value, else_value]) = (guard, operands.as_slice()) {
                    let guard = self.bool_term(guard);
                    self.constraints.push(format!(
                        "(assert (= {} (ite {} {} {})))",
                        result, guard, then_value, else_value
                    ));
                }
            }
            Instruction::Assert { condition } => {
                let condition = self.bool_term(condition);
                self.goals.push(format!("(assert {})", condition));
            }
        }
    }

    fn int_term(&mut self, expr: &SsaExpr) -> String {
        match self.term(expr) {
            Term::Int(t) => t,
            Term::Bool(b) => format!("(ite {} 1 0)", b),
        }
    }

    fn bool_term(&mut self, expr: &SsaExpr) -> String {
        match self.term(expr) {
            Term::Bool(b) => b,
            Term::Int(t) => format!("(not (= {} 0))", t),
        }
    }

    fn term(&mut self, expr: &SsaExpr) -> Term {
        match expr {
            Expr::Literal(value) => Term::Int(format_int(*value)),
            Expr::Variable(name) => {
                self.declare(name, SmtSort::Int);
                Term::Int(name.to_string())
            }
            Expr::ArrayAccess { array, index } => {
                self.arrays = true;
                self.declare(array, SmtSort::IntArray);
                let index = self.int_term(index);
                Term::Int(format!("(select {} {})", array, index))
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => Term::Bool(format!("(not {})", self.bool_term(operand))),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Term::Int(format!("(- {})", self.int_term(operand))),
            Expr::Binary { op, left, right } => {
                if matches!(op, BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
                    && left.as_literal().is_none()
                    && right.as_literal().is_none()
                {
                    self.nonlinear = true;
                }

                let l = self.int_term(left);
                let r = self.int_term(right);
                match op {
                    BinaryOp::Eq => Term::Bool(format!("(= {} {})", l, r)),
                    BinaryOp::Neq => Term::Bool(format!("(not (= {} {}))", l, r)),
                    BinaryOp::Lt => Term::Bool(format!("(< {} {})", l, r)),
                    BinaryOp::Lte => Term::Bool(format!("(<= {} {})", l, r)),
                    BinaryOp::Gt => Term::Bool(format!("(> {} {})", l, r)),
                    BinaryOp::Gte => Term::Bool(format!("(>= {} {})", l, r)),
                    BinaryOp::Add => Term::Int(format!("(+ {} {})", l, r)),
                    BinaryOp::Sub => Term::Int(format!("(- {} {})", l, r)),
                    BinaryOp::Mul => Term::Int(format!("(* {} {})", l, r)),
                    BinaryOp::Div => Term::Int(format!("(div {} {})", l, r)),
                    BinaryOp::Mod => Term::Int(format!("(mod {} {})", l, r)),
                }
            }
        }
    }
}

/// SMT-LIB has no negative numerals.
fn format_int(value: i64) -> String {
    if value < 0 {
        format!("(- {})", value.unsigned_abs())
    } else {
        value.to_string()
    }
}
