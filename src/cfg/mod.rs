use id_arena::{Arena, Id};
use serde::Serialize;

use crate::ast::{Expr, Expression};

pub mod cfg_builder;

pub use cfg_builder::{build_cfg, CfgBuilder};

// Arena-based IDs; allocation order is the depth-first visit order.
pub type NodeId = Id<CfgNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgNode {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub label: Option<String>,
}

/// Statement-level control flow graph of a program.
#[derive(Debug)]
pub struct Cfg {
    pub nodes: Arena<CfgNode>,
    pub edges: Vec<CfgEdge>,
    /// The `Program Start` node.
    pub root: NodeId,
}

impl Cfg {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id].label
    }

    /// Edges leaving `id`, in insertion order.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = &CfgEdge> {
        self.edges.iter().filter(move |edge| edge.from == id)
    }

    /// Plain `{ nodes, edges }` view with numeric ids, ready for serialization.
    pub fn to_document(&self) -> CfgDocument {
        CfgDocument {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| NodeEntry {
                    id: id.index(),
                    label: node.label.clone(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|edge| EdgeEntry {
                    from: edge.from.index(),
                    to: edge.to.index(),
                    label: edge.label.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CfgDocument {
    pub nodes: Vec<NodeEntry>,
    pub edges: Vec<EdgeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeEntry {
    pub id: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeEntry {
    pub from: usize,
    pub to: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Source-like rendering for node labels: `x + 1`, `a[i - 1]`. Only nested
/// binary operands are parenthesized.
pub fn format_label_expression(expr: &Expression) -> String {
    fn operand(expr: &Expression) -> String {
        match expr {
            Expr::Binary { .. } => format!("({})", format_label_expression(expr)),
            _ => format_label_expression(expr),
        }
    }

    match expr {
        Expr::Binary { op, left, right } => {
            format!("{} {} {}", operand(left), op.symbol(), operand(right))
        }
        Expr::Unary { op, operand: inner } => format!("{}{}", op.symbol(), operand(inner)),
        Expr::Variable(name) => name.clone(),
        Expr::Literal(value) => value.to_string(),
        Expr::ArrayAccess { array, index } => {
            format!("{}[{}]", array, format_label_expression(index))
        }
    }
}
