pub mod parse;

pub use parse::{parse_expression, parse_program};
