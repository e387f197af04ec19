use crate::ast::*;
use crate::cfg::format_label_expression;
use std::io::{Result, Write};

#[derive(Debug, Clone)]
pub struct PrintOptions {
    pub mode: PrintMode,
    pub show_spans: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintMode {
    Verbose,
    Summary,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            mode: PrintMode::Verbose,
            show_spans: false,
        }
    }
}

pub fn print_program_to_writer(program: &Program, opts: &PrintOptions, writer: &mut impl Write) -> Result<()> {
    let mut printer = WriterPrinter::new(opts, writer);
    printer.print_program(program)
}

pub fn format_program(program: &Program, opts: &PrintOptions) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = print_program_to_writer(program, opts, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatementCounts {
    pub assignments: usize,
    pub branches: usize,
    pub loops: usize,
    pub assertions: usize,
}

/// Counts statements at every nesting level.
pub fn count_statements(statements: &[Statement]) -> StatementCounts {
    let mut counts = StatementCounts::default();
    for stmt in statements {
        match &stmt.node {
            StatementKind::Assignment(_) => counts.assignments += 1,
            StatementKind::Assert { .. } => counts.assertions += 1,
            StatementKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                counts.branches += 1;
                counts.add(count_statements(then_branch));
                counts.add(count_statements(else_branch));
            }
            StatementKind::While { body, .. } => {
                counts.loops += 1;
                counts.add(count_statements(body));
            }
            StatementKind::For { body, .. } => {
                counts.loops += 1;
                counts.assignments += 2;
                counts.add(count_statements(body));
            }
        }
    }
    counts
}

impl StatementCounts {
    fn add(&mut self, other: StatementCounts) {
        self.assignments += other.assignments;
        self.branches += other.branches;
        self.loops += other.loops;
        self.assertions += other.assertions;
    }
}

struct WriterPrinter<'a, W: Write> {
    opts: &'a PrintOptions,
    writer: &'a mut W,
    depth: usize,
}

impl<'a, W: Write> WriterPrinter<'a, W> {
    fn new(opts: &'a PrintOptions, writer: &'a mut W) -> Self {
        Self {
            opts,
            writer,
            depth: 0,
        }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }

    fn span(&self, span: &Span) -> String {
        if self.opts.show_spans {
            format!(" @{}:{}", span.line, span.column)
        } else {
            String::new()
        }
    }

    fn line(&mut self, text: &str) -> Result<()> {
        let indent = self.indent();
        writeln!(self.writer, "{}{}", indent, text)
    }

    fn print_program(&mut self, program: &Program) -> Result<()> {
        match self.opts.mode {
            PrintMode::Summary => self.print_summary(program),
            PrintMode::Verbose => self.print_verbose(program),
        }
    }

    fn print_summary(&mut self, program: &Program) -> Result<()> {
        let counts = count_statements(&program.statements);
        writeln!(self.writer, "AST Summary:")?;
        writeln!(self.writer, " - Top-level statements: {}", program.statements.len())?;
        writeln!(self.writer, " - Assignments: {}", counts.assignments)?;
        writeln!(self.writer, " - Branches: {}", counts.branches)?;
        writeln!(self.writer, " - Loops: {}", counts.loops)?;
        writeln!(self.writer, " - Assertions: {}", counts.assertions)?;
        writeln!(
            self.writer,
            " - Straight-line: {}",
            if program.is_straight_line() { "yes" } else { "no" }
        )
    }

    fn print_verbose(&mut self, program: &Program) -> Result<()> {
        writeln!(self.writer, "Program ({} statements)", program.statements.len())?;
        self.depth = 1;
        for stmt in &program.statements {
            self.print_statement(stmt)?;
        }
        self.depth = 0;
        Ok(())
    }

    fn print_block(&mut self, header: &str, statements: &[Statement]) -> Result<()> {
        self.line(header)?;
        self.depth += 1;
        for stmt in statements {
            self.print_statement(stmt)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn print_statement(&mut self, stmt: &Statement) -> Result<()> {
        let span = self.span(&stmt.span);
        match &stmt.node {
            StatementKind::Assignment(assign) => self.line(&format!(
                "Assign {} := {}{}",
                assign.target,
                format_label_expression(&assign.value),
                span
            )),
            StatementKind::Assert { condition } => {
                self.line(&format!("Assert ({}){}", format_label_expression(condition), span))
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.line(&format!("If ({}){}", format_label_expression(condition), span))?;
                self.depth += 1;
                self.print_block("Then:", then_branch)?;
                if !else_branch.is_empty() {
                    self.print_block("Else:", else_branch)?;
                }
                self.depth -= 1;
                Ok(())
            }
            StatementKind::While { condition, body } => self.print_block(
                &format!("While ({}){}", format_label_expression(condition), span),
                body,
            ),
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => self.print_block(
                &format!(
                    "For ({} := {}; {}; {} := {}){}",
                    init.target,
                    format_label_expression(&init.value),
                    format_label_expression(condition),
                    update.target,
                    format_label_expression(&update.value),
                    span
                ),
                body,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_program;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "x := 3;\nif (x < 5) {\n  y := x + 1;\n}\nfor (i := 0; i < 2; i := i + 1) {\n  assert(i >= 0);\n}";

    #[test]
    fn verbose_tree_with_spans() {
        let program = parse_program(SOURCE).unwrap();
        let opts = PrintOptions {
            mode: PrintMode::Verbose,
            show_spans: true,
        };
        assert_eq!(
            format_program(&program, &opts),
            "Program (3 statements)\n\
             \x20 Assign x := 3 @1:1\n\
             \x20 If (x < 5) @2:1\n\
             \x20   Then:\n\
             \x20     Assign y := x + 1 @3:3\n\
             \x20 For (i := 0; i < 2; i := i + 1) @5:1\n\
             \x20   Assert (i >= 0) @6:3\n"
        );
    }

    #[test]
    fn summary_counts_nested_statements() {
        let program = parse_program(SOURCE).unwrap();
        let opts = PrintOptions {
            mode: PrintMode::Summary,
            show_spans: false,
        };
        let text = format_program(&program, &opts);
        assert!(text.contains(" - Assignments: 4\n"));
        assert!(text.contains(" - Loops: 1\n"));
        assert!(text.contains(" - Straight-line: no\n"));
    }
}
