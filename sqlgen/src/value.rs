//! Bound parameter values (spec.md §6.2, §6.3): the generator never
//! interpolates a literal's text into the SQL it emits, it binds it as a
//! placeholder and carries the value alongside the query text.

use bigdecimal::BigDecimal;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Numeric(BigDecimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
}
