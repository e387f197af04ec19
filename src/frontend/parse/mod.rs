//! Line-oriented statement parser.
//!
//! Source lines are cut into statement segments at top-level `;`, then blocks
//! are recovered by counting braces. Expressions inside a segment are handed to
//! [`expression::parse_expression`].

use std::collections::VecDeque;

use crate::ast::*;

pub mod expression;

pub use expression::parse_expression;

/// One statement-sized piece of a physical source line.
#[derive(Debug, Clone)]
struct SourceLine {
    number: usize,
    column: usize,
    text: String,
}

impl SourceLine {
    fn new(number: usize, raw: &str, start: usize) -> Self {
        let leading = raw.len() - raw.trim_start().len();
        Self {
            number,
            column: start + leading + 1,
            text: raw.trim().to_string(),
        }
    }

    fn span(&self) -> Span {
        Span::new(self.number, self.column)
    }

    /// The part of this line starting at byte `offset`.
    fn tail(&self, offset: usize) -> SourceLine {
        SourceLine::new(self.number, &self.text[offset..], self.column - 1 + offset)
    }

    fn head(&self, end: usize) -> SourceLine {
        SourceLine::new(self.number, &self.text[..end], self.column - 1)
    }
}

fn error_at(line: &SourceLine, message: impl Into<String>) -> SpannedError {
    SpannedError::syntax(message, line.text.clone(), line.span())
}

pub fn parse_program(source: &str) -> Results<Program> {
    let statements = parse_lines(split_statements(source))?;
    Ok(Program::new(statements))
}

fn parse_lines(lines: Vec<SourceLine>) -> Results<Vec<Statement>> {
    let mut parser = StatementParser {
        lines: VecDeque::from(lines),
    };
    let mut statements = Vec::new();
    while let Some(line) = parser.lines.pop_front() {
        statements.push(parser.parse_statement(line)?);
    }
    Ok(statements)
}

/// Splits every physical line at `;` outside parentheses, keeping the `;` on
/// the segment it ends. Blank segments and `//` comments are dropped.
fn split_statements(source: &str) -> Vec<SourceLine> {
    let mut segments = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let bytes = raw.as_bytes();
        let mut depth = 0i32;
        let mut start = 0;
        let mut end = raw.len();

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => depth -= 1,
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    end = i;
                    break;
                }
                b';' if depth <= 0 => {
                    push_segment(&mut segments, number, raw, start, i + 1);
                    start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }

        if start < end {
            push_segment(&mut segments, number, raw, start, end);
        }
    }

    segments
}

fn push_segment(segments: &mut Vec<SourceLine>, number: usize, raw: &str, start: usize, end: usize) {
    let piece = &raw[start..end];
    if !piece.trim().is_empty() {
        segments.push(SourceLine::new(number, piece, start));
    }
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.starts_with(keyword)
        && text[keyword.len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'))
}

struct StatementParser {
    lines: VecDeque<SourceLine>,
}

impl StatementParser {
    fn parse_statement(&mut self, line: SourceLine) -> Results<Statement> {
        let text = line.text.as_str();

        if starts_with_keyword(text, "if") {
            self.parse_if(line)
        } else if starts_with_keyword(text, "while") {
            self.parse_while(line)
        } else if starts_with_keyword(text, "for") {
            self.parse_for(line)
        } else if starts_with_keyword(text, "assert") {
            parse_assert(&line)
        } else if starts_with_keyword(text, "else") {
            Err(error_at(&line, "`else` without a preceding `if` block"))
        } else if text.starts_with('}') {
            Err(error_at(&line, "unexpected `}`"))
        } else if text.contains(":=") {
            let assign = parse_assignment_text(&line, text)?;
            Ok(Spanned {
                node: StatementKind::Assignment(assign),
                span: line.span(),
            })
        } else {
            Err(error_at(&line, "unrecognized statement"))
        }
    }

    fn parse_if(&mut self, line: SourceLine) -> Results<Statement> {
        let header = parse_header(&line, "if")?;
        let condition = expression_at(&line, &header.inner)?;
        let then_branch = parse_lines(self.collect_block(&line, header.brace)?)?;

        let else_branch = match self.lines.pop_front() {
            Some(next) if starts_with_keyword(&next.text, "else") => self.parse_else(next)?,
            Some(next) => {
                self.lines.push_front(next);
                Vec::new()
            }
            None => Vec::new(),
        };

        Ok(Spanned {
            node: StatementKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span: line.span(),
        })
    }

    fn parse_else(&mut self, line: SourceLine) -> Results<Vec<Statement>> {
        let after = &line.text["else".len()..];
        let offset = line.text.len() - after.trim_start().len();
        let rest = line.tail(offset);

        if starts_with_keyword(&rest.text, "if") {
            Ok(vec![self.parse_if(rest)?])
        } else if rest.text.starts_with('{') {
            parse_lines(self.collect_block(&rest, 0)?)
        } else {
            Err(error_at(&line, "expected `{` after `else`"))
        }
    }

    fn parse_while(&mut self, line: SourceLine) -> Results<Statement> {
        let header = parse_header(&line, "while")?;
        let condition = expression_at(&line, &header.inner)?;
        let body = parse_lines(self.collect_block(&line, header.brace)?)?;

        Ok(Spanned {
            node: StatementKind::While { condition, body },
            span: line.span(),
        })
    }

    fn parse_for(&mut self, line: SourceLine) -> Results<Statement> {
        let header = parse_header(&line, "for")?;
        let parts: Vec<&str> = header.inner.split(';').collect();
        if parts.len() != 3 {
            return Err(error_at(
                &line,
                "`for` header must have the form `init; condition; update`",
            ));
        }

        let init = parse_assignment_text(&line, parts[0])?;
        let condition = expression_at(&line, parts[1])?;
        let update = parse_assignment_text(&line, parts[2])?;
        let body = parse_lines(self.collect_block(&line, header.brace)?)?;

        Ok(Spanned {
            node: StatementKind::For {
                init,
                condition,
                update,
                body,
            },
            span: line.span(),
        })
    }

    /// Gathers the lines of the block whose `{` sits at byte `brace` of
    /// `header`. Text after the closing `}` goes back onto the queue.
    fn collect_block(&mut self, header: &SourceLine, brace: usize) -> Results<Vec<SourceLine>> {
        let mut depth = 1usize;
        let mut body = Vec::new();

        let rest = header.tail(brace + 1);
        let mut pending = if rest.text.is_empty() { None } else { Some(rest) };

        loop {
            let current = match pending.take().or_else(|| self.lines.pop_front()) {
                Some(current) => current,
                None => return Err(error_at(header, "unmatched `{`: block is never closed")),
            };

            let mut close_at = None;
            for (i, ch) in current.text.char_indices() {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            close_at = Some(i);
                            break;
                        }
                    }
                    _ => {}
                }
            }

            match close_at {
                None => body.push(current),
                Some(i) => {
                    let before = current.head(i);
                    if !before.text.is_empty() {
                        body.push(before);
                    }
                    let after = current.tail(i + 1);
                    if !after.text.is_empty() {
                        self.lines.push_front(after);
                    }
                    return Ok(body);
                }
            }
        }
    }
}

struct Header {
    inner: String,
    /// Byte offset of the opening `{` in the header line.
    brace: usize,
}

/// Parses `keyword (inner) {` at the start of `line`.
fn parse_header(line: &SourceLine, keyword: &str) -> Results<Header> {
    let text = line.text.as_str();
    let after_kw = &text[keyword.len()..];
    let open = keyword.len() + (after_kw.len() - after_kw.trim_start().len());

    if !text[open..].starts_with('(') {
        return Err(error_at(line, format!("expected `(` after `{}`", keyword)));
    }
    let close = expression::matching_close(text, open)
        .ok_or_else(|| error_at(line, format!("unbalanced parentheses in `{}` header", keyword)))?;

    let after_paren = &text[close + 1..];
    let brace = close + 1 + (after_paren.len() - after_paren.trim_start().len());
    if !text[brace..].starts_with('{') {
        return Err(error_at(line, format!("expected `{{` after `{} (...)`", keyword)));
    }

    Ok(Header {
        inner: text[open + 1..close].to_string(),
        brace,
    })
}

fn parse_assert(line: &SourceLine) -> Results<Statement> {
    let text = line.text.as_str();
    let after_kw = &text["assert".len()..];
    let open = "assert".len() + (after_kw.len() - after_kw.trim_start().len());

    let close = if text[open..].starts_with('(') {
        expression::matching_close(text, open)
    } else {
        None
    };

    match close {
        Some(close) if text[close + 1..].trim() == ";" => {
            let condition = expression_at(line, &text[open + 1..close])?;
            Ok(Spanned {
                node: StatementKind::Assert { condition },
                span: line.span(),
            })
        }
        _ => Err(error_at(line, "expected `assert(condition);`")),
    }
}

fn parse_assignment_text(line: &SourceLine, text: &str) -> Results<Assignment> {
    let (target, value) = text
        .split_once(":=")
        .ok_or_else(|| error_at(line, "expected an assignment `name := expression`"))?;

    let target = target.trim();
    if !expression::is_identifier(target) {
        return Err(error_at(line, format!("invalid assignment target `{}`", target)));
    }

    let value = value.trim();
    let value = value.strip_suffix(';').unwrap_or(value);
    Ok(Assignment::new(target, expression_at(line, value)?))
}

fn expression_at(line: &SourceLine, text: &str) -> Results<Expression> {
    parse_expression(text).map_err(|message| error_at(line, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Vec<Statement> {
        match parse_program(source) {
            Ok(program) => program.statements,
            Err(err) => panic!("unexpected parse error: {}", err),
        }
    }

    fn parse_err(source: &str) -> SpannedError {
        match parse_program(source) {
            Ok(program) => panic!("expected an error, parsed {:?}", program),
            Err(err) => err,
        }
    }

    #[test]
    fn straight_line_program() {
        let stmts = parse_ok("x := 3;\ny := x + 1;\nassert(y > 0);\n");
        assert_eq!(stmts.len(), 3);
        assert_eq!(
            stmts[1].node,
            StatementKind::Assignment(Assignment::new(
                "y",
                Expr::binary(BinaryOp::Add, Expr::Variable("x".into()), Expr::Literal(1))
            ))
        );
        assert_eq!(stmts[2].span, Span::new(3, 1));
        assert!(matches!(stmts[2].node, StatementKind::Assert { .. }));
    }

    #[test]
    fn several_statements_on_one_line_get_their_own_columns() {
        let stmts = parse_ok("x := 1; y := 2;");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].span, Span::new(1, 1));
        assert_eq!(stmts[1].span, Span::new(1, 9));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let stmts = parse_ok("// setup\n\nx := 1; // trailing\n   // indented\n");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn if_else_across_lines() {
        let source = "if (x < 5) {\n  y := 1;\n}\nelse {\n  y := 2;\n}\n";
        let stmts = parse_ok(source);
        assert_eq!(stmts.len(), 1);
        match &stmts[0].node {
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                assert_eq!(condition.to_string(), "(x < 5)");
                assert_eq!(then_branch.len(), 1);
                assert_eq!(else_branch.len(), 1);
                assert_eq!(else_branch[0].span, Span::new(5, 3));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn else_on_the_closing_brace_line_and_else_if_chains() {
        let source = "if (x == 0) {\n y := 1;\n} else if (x == 1) {\n y := 2;\n} else {\n y := 3;\n}\nz := y;";
        let stmts = parse_ok(source);
        assert_eq!(stmts.len(), 2);
        let StatementKind::If { else_branch, .. } = &stmts[0].node else {
            panic!("expected if");
        };
        assert_eq!(else_branch.len(), 1);
        let StatementKind::If {
            else_branch: inner_else,
            ..
        } = &else_branch[0].node
        else {
            panic!("expected nested if");
        };
        assert_eq!(inner_else.len(), 1);
    }

    #[test]
    fn single_line_blocks_and_trailing_statements() {
        let stmts = parse_ok("while (i < 3) { i := i + 1; } j := i;");
        assert_eq!(stmts.len(), 2);
        let StatementKind::While { body, .. } = &stmts[0].node else {
            panic!("expected while");
        };
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn nested_blocks_are_kept_together() {
        let source = "while (i < 3) {\n  if (i == 1) {\n    x := i;\n  }\n  i := i + 1;\n}\n";
        let stmts = parse_ok(source);
        let StatementKind::While { body, .. } = &stmts[0].node else {
            panic!("expected while");
        };
        assert_eq!(body.len(), 2);
        assert!(matches!(body[0].node, StatementKind::If { .. }));
    }

    #[test]
    fn for_header_with_three_parts() {
        let stmts = parse_ok("for (i := 0; i < 3; i := i + 1) {\n  s := s + i;\n}");
        match &stmts[0].node {
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                assert_eq!(init.target, "i");
                assert_eq!(condition.to_string(), "(i < 3)");
                assert_eq!(update.value.to_string(), "(i + 1)");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn array_reads_parse_on_the_right_hand_side() {
        let stmts = parse_ok("x := a[i] + 1;");
        let StatementKind::Assignment(assign) = &stmts[0].node else {
            panic!("expected assignment");
        };
        assert_eq!(assign.value.to_string(), "(a[i] + 1)");
    }

    #[test]
    fn unclosed_block_is_a_syntax_error() {
        let err = parse_err("if (x > 0) {\n  y := 1;\n");
        assert!(err.is_syntax_error());
        assert_eq!(err.span, Some(Span::new(1, 1)));
    }

    #[test]
    fn stray_closing_brace_is_a_syntax_error() {
        let err = parse_err("x := 1;\n}\n");
        assert_eq!(err.span, Some(Span::new(2, 1)));
    }

    #[test]
    fn malformed_statements_are_rejected() {
        assert!(parse_err("x = 1;").is_syntax_error());
        assert!(parse_err("x := ;").is_syntax_error());
        assert!(parse_err("assert(x > 0)").is_syntax_error());
        assert!(parse_err("a[0] := 1;").is_syntax_error());
        assert!(parse_err("for (i := 0; i < 3) { }").is_syntax_error());
        assert!(parse_err("while x < 3 { }").is_syntax_error());
        assert!(parse_err("else { x := 1; }").is_syntax_error());
    }
}
