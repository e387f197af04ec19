//! The `ast` module defines the Abstract Syntax Tree for the small imperative
//! language accepted by the frontend.
//!
//! # Overview
//!
//! - **Span**: source position (1-based line and column) of a statement.
//! - **Program**: the ordered list of top-level statements.
//! - **StatementKind**: assignments, `if`/`else`, `while`, `for` and `assert`.
//! - **Expr**: a small expression tree generic over the name type, so the same
//!   shape serves source identifiers (`Expr<String>`) and SSA versioned names.
//!
//! A `Program` is built once by [`parse_program`](crate::frontend::parse_program)
//! and is immutable afterwards. The SSA converter and the CFG builder both walk
//! it independently.

use std::collections::BTreeSet;
use std::fmt;

pub mod errors;

pub use errors::{format_error, AstError, Results, SpannedError};

/// Represents a position in the source code.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

pub type Statement = Spanned<StatementKind>;

/// Source-level expression over plain identifiers.
pub type Expression = Expr<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub target: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Assignment(Assignment),
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        init: Assignment,
        condition: Expression,
        update: Assignment,
        body: Vec<Statement>,
    },
    Assert {
        condition: Expression,
    },
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum BinaryOp {
    Eq,
    Neq,
    Lte,
    Gte,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Operators in the order the expression parser tries them.
    pub const PRIORITY: [BinaryOp; 11] = [
        BinaryOp::Eq,
        BinaryOp::Neq,
        BinaryOp::Lte,
        BinaryOp::Gte,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lte | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Gt
        )
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Expr<N> {
    Binary {
        op: BinaryOp,
        left: Box<Expr<N>>,
        right: Box<Expr<N>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr<N>>,
    },
    Variable(N),
    Literal(i64),
    ArrayAccess {
        array: N,
        index: Box<Expr<N>>,
    },
}

impl<N> Expr<N> {
    pub fn binary(op: BinaryOp, left: Expr<N>, right: Expr<N>) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expr<N>) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn as_literal(&self) -> Option<i64> {
        match self {
            Expr::Literal(value) => Some(*value),
            _ => None,
        }
    }

    /// Calls `f` on every name the expression reads, left to right.
    /// The array of an `ArrayAccess` counts as a read.
    pub fn for_each_name<'a>(&'a self, f: &mut impl FnMut(&'a N)) {
        match self {
            Expr::Binary { left, right, .. } => {
                left.for_each_name(f);
                right.for_each_name(f);
            }
            Expr::Unary { operand, .. } => operand.for_each_name(f),
            Expr::Variable(name) => f(name),
            Expr::Literal(_) => {}
            Expr::ArrayAccess { array, index } => {
                f(array);
                index.for_each_name(f);
            }
        }
    }

    /// Rebuilds the expression with every name replaced by `f(name)`.
    pub fn try_map_names<M, E>(&self, f: &mut impl FnMut(&N) -> Result<M, E>) -> Result<Expr<M>, E> {
        Ok(match self {
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(left.try_map_names(f)?),
                right: Box::new(right.try_map_names(f)?),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.try_map_names(f)?),
            },
            Expr::Variable(name) => Expr::Variable(f(name)?),
            Expr::Literal(value) => Expr::Literal(*value),
            Expr::ArrayAccess { array, index } => Expr::ArrayAccess {
                array: f(array)?,
                index: Box::new(index.try_map_names(f)?),
            },
        })
    }

    pub fn map_names<M>(&self, f: &mut impl FnMut(&N) -> M) -> Expr<M> {
        let mut infallible = |name: &N| Ok::<M, std::convert::Infallible>(f(name));
        match self.try_map_names(&mut infallible) {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }
}

/// Fully parenthesized rendering, used for SSA text: `(x_0 + 1)`.
impl<N: fmt::Display> fmt::Display for Expr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Unary { op, operand } => write!(f, "{}{}", op.symbol(), operand),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::ArrayAccess { array, index } => write!(f, "{}[{}]", array, index),
        }
    }
}

impl Assignment {
    pub fn new(target: impl Into<String>, value: Expression) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_straight_line(&self) -> bool {
        self.statements.iter().all(|stmt| {
            matches!(
                stmt.node,
                StatementKind::Assignment(_) | StatementKind::Assert { .. }
            )
        })
    }
}

impl Statement {
    pub fn assignment(target: impl Into<String>, value: Expression, span: Span) -> Self {
        Spanned {
            node: StatementKind::Assignment(Assignment::new(target, value)),
            span,
        }
    }
}

/// `for (init; cond; update) { body }` as `init` followed by
/// `while (cond) { body; update }`, both spanned at the `for` header.
pub fn desugar_for(
    init: &Assignment,
    condition: &Expression,
    update: &Assignment,
    body: &[Statement],
    span: Span,
) -> (Statement, Statement) {
    let init_stmt = Spanned {
        node: StatementKind::Assignment(init.clone()),
        span,
    };

    let mut loop_body = body.to_vec();
    loop_body.push(Spanned {
        node: StatementKind::Assignment(update.clone()),
        span,
    });

    let while_stmt = Spanned {
        node: StatementKind::While {
            condition: condition.clone(),
            body: loop_body,
        },
        span,
    };

    (init_stmt, while_stmt)
}

/// Base names assigned anywhere in `statements`, nested blocks included.
pub fn assigned_names(statements: &[Statement]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for stmt in statements {
        collect_assigned(stmt, &mut names);
    }
    names
}

fn collect_assigned(stmt: &Statement, names: &mut BTreeSet<String>) {
    match &stmt.node {
        StatementKind::Assignment(assign) => {
            names.insert(assign.target.clone());
        }
        StatementKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            for inner in then_branch.iter().chain(else_branch) {
                collect_assigned(inner, names);
            }
        }
        StatementKind::While { body, .. } => {
            for inner in body {
                collect_assigned(inner, names);
            }
        }
        StatementKind::For {
            init, update, body, ..
        } => {
            names.insert(init.target.clone());
            names.insert(update.target.clone());
            for inner in body {
                collect_assigned(inner, names);
            }
        }
        StatementKind::Assert { .. } => {}
    }
}

/// Base names read anywhere in `stmt`: conditions, right-hand sides and
/// array names, nested blocks included.
pub fn read_names(stmt: &Statement) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_read(stmt, &mut names);
    names
}

fn collect_read(stmt: &Statement, names: &mut BTreeSet<String>) {
    let add = |expr: &Expression, names: &mut BTreeSet<String>| {
        expr.for_each_name(&mut |name: &String| {
            names.insert(name.clone());
        });
    };

    match &stmt.node {
        StatementKind::Assignment(assign) => add(&assign.value, names),
        StatementKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            add(condition, names);
            for inner in then_branch.iter().chain(else_branch) {
                collect_read(inner, names);
            }
        }
        StatementKind::While { condition, body } => {
            add(condition, names);
            for inner in body {
                collect_read(inner, names);
            }
        }
        StatementKind::For {
            init,
            condition,
            update,
            body,
        } => {
            add(&init.value, names);
            add(condition, names);
            add(&update.value, names);
            for inner in body {
                collect_read(inner, names);
            }
        }
        StatementKind::Assert { condition } => add(condition, names),
    }
}
