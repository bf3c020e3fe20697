//! Phase G (spec.md §4.6): walks an `ir::Arena` and emits a SQL query tree
//! for the relational backend, then renders that tree to text.
//!
//! The generator "does not type-check; inputs are assumed well-typed"
//! (spec.md §4.6) — every earlier phase has already rejected anything
//! this module would otherwise need to reject itself. Its only failure
//! mode is [`diagnostics::IceError`], for internal invariants or feature
//! gaps that escaped earlier phases.

mod ast;
mod ident;
mod lower;
mod render;
mod value;

pub use ast::{
    FromClause, FromItem, Join, JoinKind, OrderItem, SelectBody, SelectCore, SelectItem, SelectStmt, SetOp, SqlExpr,
    SqlLiteral,
};
pub use ident::{link_table_name, object_view_name, pointer_column_name, quote, qualified, AliasGen};
pub use lower::{GeneratedQuery, Generator, ParamInfo};
pub use render::{render, Rendered};
pub use value::SqlValue;
