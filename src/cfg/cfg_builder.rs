use id_arena::Arena;

use crate::ast::{self, desugar_for, StatementKind};
use crate::cfg::*;

/// Builds a CFG from an AST Program.
pub struct CfgBuilder {
    nodes: Arena<CfgNode>,
    edges: Vec<CfgEdge>,
}

pub fn build_cfg(program: &ast::Program) -> Cfg {
    CfgBuilder::build_from_program(program)
}

impl CfgBuilder {
    /// Build CFG from AST Program
    pub fn build_from_program(program: &ast::Program) -> Cfg {
        let mut builder = CfgBuilder {
            nodes: Arena::new(),
            edges: Vec::new(),
        };

        let root = builder.add_node("Program Start");
        for stmt in &program.statements {
            builder.visit(stmt, root);
        }

        Cfg {
            nodes: builder.nodes,
            edges: builder.edges,
            root,
        }
    }

    fn add_node(&mut self, label: impl Into<String>) -> NodeId {
        self.nodes.alloc(CfgNode { label: label.into() })
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, label: Option<&str>) {
        self.edges.push(CfgEdge {
            from,
            to,
            label: label.map(str::to_string),
        });
    }

    /// Adds `stmt` under `parent` and returns the statement's own node.
    fn visit(&mut self, stmt: &ast::Statement, parent: NodeId) -> NodeId {
        match &stmt.node {
            StatementKind::Assignment(assign) => {
                let id = self.add_node(format!(
                    "{} := {}",
                    assign.target,
                    format_label_expression(&assign.value)
                ));
                self.add_edge(parent, id, None);
                id
            }
            StatementKind::Assert { condition } => {
                let id = self.add_node(format!("Assert ({})", format_label_expression(condition)));
                self.add_edge(parent, id, None);
                id
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let id = self.add_node(format!("If ({})", format_label_expression(condition)));
                self.add_edge(parent, id, None);

                let then_id = self.add_node("Then");
                self.add_edge(id, then_id, Some("T"));
                for child in then_branch {
                    self.visit(child, then_id);
                }

                let else_id = self.add_node("Else");
                self.add_edge(id, else_id, Some("F"));
                for child in else_branch {
                    self.visit(child, else_id);
                }

                id
            }
            StatementKind::While { condition, body } => {
                let id = self.add_node(format!("While ({})", format_label_expression(condition)));
                self.add_edge(parent, id, None);

                let body_id = self.add_node("Loop Body");
                self.add_edge(id, body_id, Some("T"));

                let mut last = body_id;
                for child in body {
                    last = self.visit(child, body_id);
                }
                self.add_edge(last, id, None);

                id
            }
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let (init, while_stmt) = desugar_for(init, condition, update, body, stmt.span);
                self.visit(&init, parent);
                self.visit(&while_stmt, parent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_program;
    use pretty_assertions::assert_eq;

    fn cfg_of(source: &str) -> Cfg {
        build_cfg(&parse_program(source).expect("source should parse"))
    }

    fn labels(cfg: &Cfg) -> Vec<String> {
        cfg.nodes.iter().map(|(_, node)| node.label.clone()).collect()
    }

    fn edges(cfg: &Cfg) -> Vec<(usize, usize, Option<String>)> {
        cfg.edges
            .iter()
            .map(|e| (e.from.index(), e.to.index(), e.label.clone()))
            .collect()
    }

    #[test]
    fn empty_program_has_only_the_root() {
        let cfg = cfg_of("");
        assert_eq!(labels(&cfg), vec!["Program Start"]);
        assert!(cfg.edges.is_empty());
        assert_eq!(cfg.root.index(), 0);
    }

    #[test]
    fn if_else_gets_labelled_branch_markers() {
        let cfg = cfg_of("x := 3;\nif (x < 5) {\n  y := x + 1;\n} else {\n  y := x - 1;\n}");
        assert_eq!(
            labels(&cfg),
            vec!["Program Start", "x := 3", "If (x < 5)", "Then", "y := x + 1", "Else", "y := x - 1"]
        );
        assert_eq!(
            edges(&cfg),
            vec![
                (0, 1, None),
                (0, 2, None),
                (2, 3, Some("T".to_string())),
                (3, 4, None),
                (2, 5, Some("F".to_string())),
                (5, 6, None),
            ]
        );
    }

    #[test]
    fn loop_body_ends_with_a_back_edge() {
        let cfg = cfg_of("i := 0;\nwhile (i < 3) {\n  i := i + 1;\n}");
        assert_eq!(
            labels(&cfg),
            vec!["Program Start", "i := 0", "While (i < 3)", "Loop Body", "i := i + 1"]
        );
        assert_eq!(
            edges(&cfg),
            vec![(0, 1, None), (0, 2, None), (2, 3, Some("T".to_string())), (3, 4, None), (4, 2, None)]
        );
    }

    #[test]
    fn empty_loop_body_links_the_marker_back() {
        let cfg = cfg_of("while (i < 3) {\n}");
        assert_eq!(edges(&cfg), vec![(0, 1, None), (1, 2, Some("T".to_string())), (2, 1, None)]);
    }

    #[test]
    fn for_loop_is_drawn_through_its_while_form() {
        let cfg = cfg_of("for (i := 0; i < 2; i := i + 1) {\n  s := s + a[i];\n}");
        assert_eq!(
            labels(&cfg),
            vec!["Program Start", "i := 0", "While (i < 2)", "Loop Body", "s := s + a[i]", "i := i + 1"]
        );
        assert_eq!(cfg.edges.last().map(|e| (e.from.index(), e.to.index())), Some((5, 2)));
    }

    #[test]
    fn nested_operands_keep_their_grouping_in_labels() {
        let cfg = cfg_of("x := (a + b) * c;\nassert(x != 0);");
        assert_eq!(labels(&cfg)[1..], ["x := (a + b) * c", "Assert (x != 0)"]);
    }

    #[test]
    fn document_omits_absent_edge_labels() {
        let cfg = cfg_of("if (c > 0) {\n}");
        let json = serde_json::to_value(cfg.to_document()).expect("document serializes");
        assert_eq!(json["nodes"][1]["label"], "If (c > 0)");
        assert_eq!(json["edges"][0], serde_json::json!({"from": 0, "to": 1}));
        assert_eq!(json["edges"][1], serde_json::json!({"from": 1, "to": 2, "label": "T"}));
    }
}
