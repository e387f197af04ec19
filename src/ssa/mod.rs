//! Static single assignment form.
//!
//! Every source variable is split into versioned names (`x_0`, `x_1`, ...) so
//! that each name is defined exactly once. Control-flow joins are expressed
//! with [`Instruction::Phi`]; a phi produced by an `if` carries the branch
//! condition as its guard, a loop-exit phi carries the negated loop condition,
//! and a loop-entry phi carries no guard at all.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::ast::{Expr, Results, SpannedError};

pub mod ssa_builder;

pub use ssa_builder::convert_to_ssa;

/// Marker applied to every name of the second program in an equivalence query.
pub const SECOND_PROGRAM_MARKER: &str = "p2";

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionedName {
    pub base: String,
    pub version: u32,
    pub marker: Option<String>,
}

impl VersionedName {
    pub fn new(base: impl Into<String>, version: u32) -> Self {
        Self {
            base: base.into(),
            version,
            marker: None,
        }
    }

    pub fn with_marker(&self, marker: &str) -> Self {
        Self {
            marker: Some(marker.to_string()),
            ..self.clone()
        }
    }
}

impl fmt::Display for VersionedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.version)?;
        if let Some(marker) = &self.marker {
            write!(f, "_{}", marker)?;
        }
        Ok(())
    }
}

pub type SsaExpr = Expr<VersionedName>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Define {
        target: VersionedName,
        value: SsaExpr,
    },
    Phi {
        result: VersionedName,
        operands: Vec<VersionedName>,
        guard: Option<SsaExpr>,
    },
    Assert {
        condition: SsaExpr,
    },
}

impl Instruction {
    /// The name this instruction defines, if any.
    pub fn defined_name(&self) -> Option<&VersionedName> {
        match self {
            Instruction::Define { target, .. } => Some(target),
            Instruction::Phi { result, .. } => Some(result),
            Instruction::Assert { .. } => None,
        }
    }

    /// Calls `f` on every name this instruction reads.
    pub fn for_each_use<'a>(&'a self, f: &mut impl FnMut(&'a VersionedName)) {
        match self {
            Instruction::Define { value, .. } => value.for_each_name(f),
            Instruction::Phi {
                operands, guard, ..
            } => {
                operands.iter().for_each(&mut *f);
                if let Some(guard) = guard {
                    guard.for_each_name(f);
                }
            }
            Instruction::Assert { condition } => condition.for_each_name(f),
        }
    }

    /// Rewrites every name, defined or used.
    pub fn map_names(&self, f: &mut impl FnMut(&VersionedName) -> VersionedName) -> Instruction {
        match self {
            Instruction::Define { target, value } => Instruction::Define {
                target: f(target),
                value: value.map_names(f),
            },
            Instruction::Phi {
                result,
                operands,
                guard,
            } => Instruction::Phi {
                result: f(result),
                operands: operands.iter().map(&mut *f).collect(),
                guard: guard.as_ref().map(|g| g.map_names(f)),
            },
            Instruction::Assert { condition } => Instruction::Assert {
                condition: condition.map_names(f),
            },
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Define { target, value } => write!(f, "{} = {}", target, value),
            Instruction::Phi {
                result,
                operands,
                guard,
            } => {
                let operands: Vec<String> = operands.iter().map(|op| op.to_string()).collect();
                write!(f, "{} = φ({})", result, operands.join(", "))?;
                if let Some(guard) = guard {
                    write!(f, " [{}]", guard)?;
                }
                Ok(())
            }
            Instruction::Assert { condition } => write!(f, "assert({})", condition),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsaProgram {
    pub instructions: Vec<Instruction>,
    /// Base name → its versioned name once the whole program has run.
    pub final_versions: BTreeMap<String, VersionedName>,
}

/// One instruction per line.
pub fn format_ssa(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(|inst| inst.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fails if any versioned name is the target of more than one `Define`/`Phi`.
pub fn check_single_assignment(instructions: &[Instruction]) -> Results<()> {
    let mut seen = HashSet::new();
    for name in instructions.iter().filter_map(Instruction::defined_name) {
        if !seen.insert(name) {
            return Err(SpannedError::internal(format!("{} is defined more than once", name)));
        }
    }
    Ok(())
}

/// Copies `instructions` with `marker` attached to every name.
pub fn mark_names(instructions: &[Instruction], marker: &str) -> Vec<Instruction> {
    instructions
        .iter()
        .map(|inst| inst.map_names(&mut |name: &VersionedName| name.with_marker(marker)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use pretty_assertions::assert_eq;

    fn v(base: &str, version: u32) -> VersionedName {
        VersionedName::new(base, version)
    }

    #[test]
    fn instructions_render_in_ssa_text_form() {
        let instructions = vec![
            Instruction::Define {
                target: v("x", 0),
                value: Expr::Literal(3),
            },
            Instruction::Phi {
                result: v("x", 2),
                operands: vec![v("x", 0), v("x", 1)],
                guard: Some(Expr::binary(BinaryOp::Lt, Expr::Variable(v("x", 0)), Expr::Literal(5))),
            },
            Instruction::Phi {
                result: v("i", 1),
                operands: vec![v("i", 0), v("i", 2)],
                guard: None,
            },
            Instruction::Assert {
                condition: Expr::binary(BinaryOp::Gt, Expr::Variable(v("x", 2)), Expr::Literal(0)),
            },
        ];

        assert_eq!(
            format_ssa(&instructions),
            "x_0 = 3\nx_2 = φ(x_0, x_1) [(x_0 < 5)]\ni_1 = φ(i_0, i_2)\nassert((x_2 > 0))"
        );
    }

    #[test]
    fn markers_rename_every_occurrence() {
        let inst = Instruction::Define {
            target: v("y", 0),
            value: Expr::binary(BinaryOp::Add, Expr::Variable(v("x", 0)), Expr::Literal(1)),
        };
        let marked = mark_names(&[inst], SECOND_PROGRAM_MARKER);
        assert_eq!(marked[0].to_string(), "y_0_p2 = (x_0_p2 + 1)");
        assert_eq!(marked[0].defined_name().map(|n| n.base.as_str()), Some("y"));
    }

    #[test]
    fn duplicate_definitions_are_internal_errors() {
        let define = Instruction::Define {
            target: v("x", 0),
            value: Expr::Literal(1),
        };
        assert!(check_single_assignment(&[define.clone()]).is_ok());
        let err = check_single_assignment(&[define.clone(), define]).unwrap_err();
        assert!(!err.is_syntax_error());
        assert!(err.to_string().contains("x_0"));
    }
}
