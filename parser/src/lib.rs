//! Phase P (spec.md §4.2): a recursive-descent/operator-precedence hybrid
//! parser producing the AST of spec.md §3.1.

pub mod ast;
mod cursor;
mod parser;

pub use parser::{parse_expr, parse_script, parse_statement};
