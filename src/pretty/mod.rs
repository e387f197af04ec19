pub mod ast_printer;
pub mod cfg_printer;
pub mod ssa_printer;

pub use ast_printer::*;
pub use cfg_printer::*;
pub use ssa_printer::*;
