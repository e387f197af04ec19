use crate::cfg::*;
use std::io::{Result, Write};

fn escape_dot_label(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

/// Print options for CFG output
#[derive(Debug, Clone)]
pub struct CfgPrintOptions {
    pub format: CfgFormat,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgFormat {
    Text,
    Dot,
    Json,
    Summary,
}

impl Default for CfgPrintOptions {
    fn default() -> Self {
        Self {
            format: CfgFormat::Text,
            verbose: false,
        }
    }
}

/// Main entry point for printing CFG
pub fn print_cfg(cfg: &Cfg, options: &CfgPrintOptions, writer: &mut impl Write) -> Result<()> {
    match options.format {
        CfgFormat::Text => write!(writer, "{}", format_cfg_text(cfg, options)),
        CfgFormat::Dot => print_cfg_dot_format(cfg, writer),
        CfgFormat::Json => print_cfg_json(cfg, writer),
        CfgFormat::Summary => write!(writer, "{}", print_cfg_summary(cfg)),
    }
}

/// Edges that point back to an earlier node are loop back edges and are
/// drawn dashed.
pub fn print_cfg_dot_format(cfg: &Cfg, writer: &mut impl Write) -> Result<()> {
    writeln!(writer, "digraph CFG {{")?;
    writeln!(writer, "  node [shape=box, style=rounded];")?;
    writeln!(writer)?;

    for (id, node) in cfg.nodes.iter() {
        let shape = match node.label.as_str() {
            "Then" | "Else" | "Loop Body" => "shape=ellipse, ",
            _ if id == cfg.root => "shape=oval, ",
            _ => "",
        };
        writeln!(
            writer,
            "  n{} [{}label=\"{}\"];",
            id.index(),
            shape,
            escape_dot_label(&node.label)
        )?;
    }
    writeln!(writer)?;

    for edge in &cfg.edges {
        let mut attrs = Vec::new();
        if let Some(label) = &edge.label {
            attrs.push(format!("label=\"{}\"", escape_dot_label(label)));
        }
        if edge.to.index() < edge.from.index() {
            attrs.push("style=dashed".to_string());
        }
        if attrs.is_empty() {
            writeln!(writer, "  n{} -> n{};", edge.from.index(), edge.to.index())?;
        } else {
            writeln!(
                writer,
                "  n{} -> n{} [{}];",
                edge.from.index(),
                edge.to.index(),
                attrs.join(", ")
            )?;
        }
    }

    writeln!(writer, "}}")?;
    Ok(())
}

pub fn print_cfg_json(cfg: &Cfg, writer: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &cfg.to_document())?;
    writeln!(writer)
}

pub fn format_cfg_text(cfg: &Cfg, options: &CfgPrintOptions) -> String {
    let mut s = String::new();
    s.push_str("Control Flow Graph (CFG):\n");
    s.push_str("===========================\n\n");

    s.push_str("Nodes:\n");
    for (id, node) in cfg.nodes.iter() {
        s.push_str(&format!("  {}: {}\n", id.index(), node.label));
        if options.verbose {
            for edge in cfg.successors(id) {
                s.push_str(&format!(
                    "      -> {} ({})\n",
                    edge.to.index(),
                    cfg.label(edge.to)
                ));
            }
        }
    }

    s.push_str("\nEdges:\n");
    for edge in &cfg.edges {
        match &edge.label {
            Some(label) => s.push_str(&format!(
                "  {} -> {} [{}]\n",
                edge.from.index(),
                edge.to.index(),
                label
            )),
            None => s.push_str(&format!("  {} -> {}\n", edge.from.index(), edge.to.index())),
        }
    }
    s
}

pub fn print_cfg_summary(cfg: &Cfg) -> String {
    let back_edges = cfg
        .edges
        .iter()
        .filter(|edge| edge.to.index() < edge.from.index())
        .count();

    let mut s = String::new();
    s.push_str("CFG Summary:\n");
    s.push_str("============\n\n");
    s.push_str(&format!("Total Nodes: {}\n", cfg.node_count()));
    s.push_str(&format!("Total Edges: {}\n", cfg.edges.len()));
    s.push_str(&format!("Back Edges: {}\n", back_edges));
    s
}
