use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::optimization::OptimizationPass;
use crate::ssa::{Instruction, SsaExpr, VersionedName};
use std::collections::HashMap;

/// Constant Propagation optimization pass
pub struct ConstantPropagationPass;

impl OptimizationPass for ConstantPropagationPass {
    fn name(&self) -> &'static str {
        "Constant Propagation"
    }

    fn optimize_instructions(&self, instructions: &mut Vec<Instruction>) -> bool {
        let mut constants: HashMap<VersionedName, i64> = instructions
            .iter()
            .filter_map(|inst| match inst {
                Instruction::Define {
                    target,
                    value: Expr::Literal(value),
                } => Some((target.clone(), *value)),
                _ => None,
            })
            .collect();

        let mut changed = false;

        for inst in instructions.iter_mut() {
            let rewritten = match &*inst {
                Instruction::Define { target, value } => {
                    let value = self.fold(value, &constants);
                    if let Some(constant) = value.as_literal() {
                        constants.insert(target.clone(), constant);
                    }
                    Instruction::Define {
                        target: target.clone(),
                        value,
                    }
                }
                // Operands stay names; only the guard is an expression.
                Instruction::Phi {
                    result,
                    operands,
                    guard,
                } => Instruction::Phi {
                    result: result.clone(),
                    operands: operands.clone(),
                    guard: guard.as_ref().map(|g| self.fold(g, &constants)),
                },
                Instruction::Assert { condition } => Instruction::Assert {
                    condition: self.fold(condition, &constants),
                },
            };

            if rewritten != *inst {
                *inst = rewritten;
                changed = true;
            }
        }

        changed
    }
}

impl Default for ConstantPropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPropagationPass {
    pub fn new() -> Self {
        Self
    }

    /// Substitutes known constants and folds every operator whose operands
    /// became literals.
    fn fold(&self, expr: &SsaExpr, constants: &HashMap<VersionedName, i64>) -> SsaExpr {
        match expr {
            Expr::Variable(name) => match constants.get(name) {
                Some(value) => Expr::Literal(*value),
                None => expr.clone(),
            },
            Expr::Literal(_) => expr.clone(),
            Expr::ArrayAccess { array, index } => Expr::ArrayAccess {
                array: array.clone(),
                index: Box::new(self.fold(index, constants)),
            },
            Expr::Unary { op, operand } => {
                let operand = self.fold(operand, constants);
                match operand.as_literal().and_then(|value| self.evaluate_unary_op(*op, value)) {
                    Some(value) => Expr::Literal(value),
                    None => Expr::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.fold(left, constants);
                let right = self.fold(right, constants);
                match (left.as_literal(), right.as_literal()) {
                    (Some(a), Some(b)) => match evaluate_binary_op(*op, a, b) {
                        Some(value) => Expr::Literal(value),
                        None => Expr::binary(*op, left, right),
                    },
                    _ => Expr::binary(*op, left, right),
                }
            }
        }
    }

    fn evaluate_unary_op(&self, op: UnaryOp, operand: i64) -> Option<i64> {
        match op {
            UnaryOp::Not => Some((operand == 0) as i64),
            UnaryOp::Neg => operand.checked_neg(),
        }
    }
}

/// Evaluates `a op b` with SMT-LIB integer semantics: comparisons yield 1/0,
/// `/` and `%` are Euclidean. Overflow and division by zero give `None`.
pub fn evaluate_binary_op(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div if b != 0 => a.checked_div_euclid(b),
        BinaryOp::Mod if b != 0 => a.checked_rem_euclid(b),
        BinaryOp::Div | BinaryOp::Mod => None,

        BinaryOp::Eq => Some((a == b) as i64),
        BinaryOp::Neq => Some((a != b) as i64),
        BinaryOp::Lt => Some((a < b) as i64),
        BinaryOp::Lte => Some((a <= b) as i64),
        BinaryOp::Gt => Some((a > b) as i64),
        BinaryOp::Gte => Some((a >= b) as i64),
    }
}
