use crate::optimization::OptimizationPass;
use crate::ssa::{Instruction, VersionedName};
use std::collections::HashMap;

/// Removes `Define`s whose target is never read. Phis and assertions stay.
pub struct DeadCodeEliminationPass;

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeEliminationPass {
    pub fn new() -> Self {
        Self
    }

    fn count_uses(instructions: &[Instruction]) -> HashMap<&VersionedName, usize> {
        let mut uses = HashMap::new();
        for inst in instructions {
            inst.for_each_use(&mut |name| *uses.entry(name).or_insert(0) += 1);
        }
        uses
    }
}

impl OptimizationPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "Dead Code Elimination"
    }

    fn optimize_instructions(&self, instructions: &mut Vec<Instruction>) -> bool {
        let mut changed = false;

        // Dropping a define can orphan the defines it read, so sweep until stable.
        loop {
            let dead: Vec<usize> = {
                let uses = Self::count_uses(instructions);
                instructions
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, inst)| match inst {
                        Instruction::Define { target, .. } if !uses.contains_key(target) => Some(idx),
                        _ => None,
                    })
                    .collect()
            };

            if dead.is_empty() {
                break;
            }

            let mut idx = 0;
            instructions.retain(|_| {
                let keep = dead.binary_search(&idx).is_err();
                idx += 1;
                keep
            });
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Expr};
    use crate::ssa::format_ssa;
    use pretty_assertions::assert_eq;

    fn v(base: &str, version: u32) -> VersionedName {
        VersionedName::new(base, version)
    }

    #[test]
    fn unused_chains_are_removed_transitively() {
        let mut instructions = vec![
            Instruction::Define {
                target: v("a", 0),
                value: Expr::Variable(v("n", 0)),
            },
            Instruction::Define {
                target: v("b", 0),
                value: Expr::binary(BinaryOp::Add, Expr::Variable(v("a", 0)), Expr::Literal(1)),
            },
            Instruction::Define {
                target: v("c", 0),
                value: Expr::Variable(v("n", 0)),
            },
            Instruction::Assert {
                condition: Expr::binary(BinaryOp::Gt, Expr::Variable(v("c", 0)), Expr::Literal(0)),
            },
        ];

        assert!(DeadCodeEliminationPass::new().optimize_instructions(&mut instructions));
        assert_eq!(format_ssa(&instructions), "c_0 = n_0\nassert((c_0 > 0))");
        assert!(!DeadCodeEliminationPass::new().optimize_instructions(&mut instructions));
    }

    #[test]
    fn phi_operands_and_array_names_count_as_uses() {
        let mut instructions = vec![
            Instruction::Define {
                target: v("a", 1),
                value: Expr::Variable(v("a", 0)),
            },
            Instruction::Define {
                target: v("x", 0),
                value: Expr::Literal(1),
            },
            Instruction::Define {
                target: v("y", 0),
                value: Expr::ArrayAccess {
                    array: v("a", 1),
                    index: Box::new(Expr::Literal(0)),
                },
            },
            Instruction::Phi {
                result: v("x", 2),
                operands: vec![v("x", 0), v("y", 0)],
                guard: None,
            },
        ];

        assert!(!DeadCodeEliminationPass::new().optimize_instructions(&mut instructions));
        assert_eq!(instructions.len(), 4);
    }
}
