//! Flat expression grammar.
//!
//! There is no precedence climbing: after optional enclosing parentheses and
//! array access are peeled off, the first operator of [`BinaryOp::PRIORITY`]
//! that occurs outside brackets splits the text into two operands, and the
//! right operand is everything after it. So `a - b - c` reads as `a - (b - c)`;
//! parenthesize to get the other grouping.

use crate::ast::{BinaryOp, Expr, Expression};

pub fn parse_expression(text: &str) -> Result<Expression, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("missing operand".to_string());
    }

    if let Some(inner) = strip_enclosing_parens(text) {
        return parse_expression(inner);
    }

    if let Some((array, index)) = split_array_access(text) {
        return Ok(Expr::ArrayAccess {
            array: array.to_string(),
            index: Box::new(parse_expression(index)?),
        });
    }

    // Whole-text integers first so `-1` is a literal rather than `"" - 1`.
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Expr::Literal(value));
    }

    for op in BinaryOp::PRIORITY {
        if let Some(pos) = find_top_level(text, op.symbol()) {
            let left = parse_expression(&text[..pos])?;
            let right = parse_expression(&text[pos + op.symbol().len()..])?;
            return Ok(Expr::binary(op, left, right));
        }
    }

    if is_identifier(text) {
        return Ok(Expr::Variable(text.to_string()));
    }

    Err(format!("invalid operand `{}`", text))
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Byte offset of the closing bracket that matches the opening one at `open`.
pub(crate) fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_enclosing_parens(text: &str) -> Option<&str> {
    if text.starts_with('(') && text.ends_with(')') && matching_close(text, 0) == Some(text.len() - 1) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn split_array_access(text: &str) -> Option<(&str, &str)> {
    let open = text.find('[')?;
    if !text.ends_with(']') {
        return None;
    }
    let name = text[..open].trim();
    if !is_identifier(name) || matching_close(text, open) != Some(text.len() - 1) {
        return None;
    }
    Some((name, &text[open + 1..text.len() - 1]))
}

fn find_top_level(text: &str, symbol: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ if depth == 0 && text[i..].starts_with(symbol) => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(text: &str) -> String {
        parse_expression(text).map(|e| e.to_string()).unwrap_or_else(|e| format!("error: {}", e))
    }

    #[test]
    fn literals_and_variables() {
        assert_eq!(parse_expression("42"), Ok(Expr::Literal(42)));
        assert_eq!(parse_expression("-7"), Ok(Expr::Literal(-7)));
        assert_eq!(parse_expression(" count_1 "), Ok(Expr::Variable("count_1".to_string())));
    }

    #[test]
    fn splits_on_first_operator_of_the_priority_list() {
        assert_eq!(render("x + 1"), "(x + 1)");
        assert_eq!(render("a + b * c"), "(a + (b * c))");
        assert_eq!(render("a * b + c"), "((a * b) + c)");
        assert_eq!(render("a - b - c"), "(a - (b - c))");
        assert_eq!(render("x + 1 > 0"), "((x + 1) > 0)");
    }

    #[test]
    fn two_character_operators_win_over_their_prefixes() {
        assert_eq!(render("x <= 3"), "(x <= 3)");
        assert_eq!(render("x >= 3"), "(x >= 3)");
        assert_eq!(render("x != y"), "(x != y)");
        assert_eq!(render("x == y"), "(x == y)");
    }

    #[test]
    fn parentheses_group_and_are_not_split_inside() {
        assert_eq!(render("(a + b) * c"), "((a + b) * c)");
        assert_eq!(render("((y))"), "y");
    }

    #[test]
    fn array_access_is_detected_before_operators() {
        assert_eq!(render("a[i + 1]"), "a[(i + 1)]");
        assert_eq!(render("a[i] + b[j]"), "(a[i] + b[j])");
        assert_eq!(render("a[b[0]]"), "a[b[0]]");
    }

    #[test]
    fn malformed_operands_are_rejected() {
        assert_eq!(render("x +"), "error: missing operand");
        assert_eq!(render("3x"), "error: invalid operand `3x`");
        assert_eq!(render("(a + b"), "error: invalid operand `(a + b`");
        assert_eq!(render("!x"), "error: invalid operand `!x`");
    }
}
