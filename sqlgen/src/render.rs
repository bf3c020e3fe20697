//! Renders the internal SQL tree (`ast.rs`) to query text plus its bound
//! parameter list (spec.md §6.2: "a parameterized SQL string and the
//! positional values to bind").

use itertools::Itertools;

use crate::ast::{
    FromClause, FromItem, Join, JoinKind, OrderItem, SelectBody, SelectCore, SelectItem,
    SelectStmt, SqlExpr, SqlLiteral,
};
use crate::value::SqlValue;

pub struct Rendered {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub fn render(stmt: &SelectStmt) -> Rendered {
    let mut out = String::new();
    let mut params = Vec::new();
    render_stmt(stmt, &mut out, &mut params);
    Rendered { sql: out, params }
}

fn render_stmt(stmt: &SelectStmt, out: &mut String, params: &mut Vec<SqlValue>) {
    if !stmt.ctes.is_empty() {
        out.push_str("WITH ");
        for (i, (name, query)) in stmt.ctes.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(name);
            out.push_str(" AS (");
            render_stmt(query, out, params);
            out.push(')');
        }
        out.push(' ');
    }
    match &stmt.body {
        Some(body) => render_body(body, out, params),
        None => out.push_str("SELECT NULL WHERE FALSE"),
    }
}

fn render_body(body: &SelectBody, out: &mut String, params: &mut Vec<SqlValue>) {
    match body {
        SelectBody::Core(core) => render_core(core, out, params),
        SelectBody::SetOp { op, left, right } => {
            out.push('(');
            render_body(left, out, params);
            out.push(')');
            out.push_str(match op {
                crate::ast::SetOp::Union => " UNION ",
                crate::ast::SetOp::UnionAll => " UNION ALL ",
            });
            out.push('(');
            render_body(right, out, params);
            out.push(')');
        }
    }
}

fn render_core(core: &SelectCore, out: &mut String, params: &mut Vec<SqlValue>) {
    out.push_str("SELECT ");
    if core.distinct {
        out.push_str("DISTINCT ");
    }
    if core.projection.is_empty() {
        out.push_str("1");
    } else {
        let rendered = core
            .projection
            .iter()
            .map(|item| render_select_item(item, params))
            .join(", ");
        out.push_str(&rendered);
    }

    if let Some(from) = &core.from {
        out.push_str(" FROM ");
        render_from_item(&from.item, out, params);
        out.push_str(" AS ");
        out.push_str(&from.alias);
    }

    for join in &core.joins {
        render_join(join, out, params);
    }

    if let Some(where_clause) = &core.where_clause {
        out.push_str(" WHERE ");
        render_expr(where_clause, out, params);
    }

    if !core.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        let rendered = core
            .order_by
            .iter()
            .map(|item| render_order_item(item, params))
            .join(", ");
        out.push_str(&rendered);
    }

    if let Some(limit) = &core.limit {
        out.push_str(" LIMIT ");
        render_expr(limit, out, params);
    }

    if let Some(offset) = &core.offset {
        out.push_str(" OFFSET ");
        render_expr(offset, out, params);
    }
}

fn render_select_item(item: &SelectItem, params: &mut Vec<SqlValue>) -> String {
    let mut buf = String::new();
    render_expr(&item.expr, &mut buf, params);
    if let Some(alias) = &item.alias {
        buf.push_str(" AS ");
        buf.push_str(alias);
    }
    buf
}

fn render_order_item(item: &OrderItem, params: &mut Vec<SqlValue>) -> String {
    let mut buf = String::new();
    render_expr(&item.expr, &mut buf, params);
    buf.push_str(if item.descending { " DESC" } else { " ASC" });
    buf
}

fn render_from_item(item: &FromItem, out: &mut String, params: &mut Vec<SqlValue>) {
    match item {
        FromItem::Table(name) => out.push_str(name),
        FromItem::Derived(stmt) => {
            out.push('(');
            render_stmt(stmt, out, params);
            out.push(')');
        }
    }
}

fn render_join(join: &Join, out: &mut String, params: &mut Vec<SqlValue>) {
    out.push_str(match join.kind {
        JoinKind::Inner => " JOIN ",
        JoinKind::Left => " LEFT JOIN ",
        JoinKind::LeftLateral => " LEFT JOIN LATERAL ",
    });
    render_from_item(&join.item, out, params);
    out.push_str(" AS ");
    out.push_str(&join.alias);
    match &join.on {
        Some(on) => {
            out.push_str(" ON ");
            render_expr(on, out, params);
        }
        None => out.push_str(" ON TRUE"),
    }
}

fn render_expr(expr: &SqlExpr, out: &mut String, params: &mut Vec<SqlValue>) {
    match expr {
        SqlExpr::Column { table, column } => {
            out.push_str(table);
            out.push('.');
            out.push_str(column);
        }
        SqlExpr::Param(idx) => {
            out.push('$');
            out.push_str(&(idx + 1).to_string());
        }
        SqlExpr::Literal(lit) => render_literal(lit, out),
        SqlExpr::Raw(text) => out.push_str(text),
        SqlExpr::BinaryOp { op, left, right } => {
            out.push('(');
            render_expr(left, out, params);
            out.push(' ');
            out.push_str(op);
            out.push(' ');
            render_expr(right, out, params);
            out.push(')');
        }
        SqlExpr::UnaryOp { op, expr } => {
            out.push('(');
            out.push_str(op);
            out.push(' ');
            render_expr(expr, out, params);
            out.push(')');
        }
        SqlExpr::FunctionCall { name, args, distinct } => {
            out.push_str(name);
            out.push('(');
            if *distinct {
                out.push_str("DISTINCT ");
            }
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_expr(arg, out, params);
            }
            out.push(')');
        }
        SqlExpr::Case { branches, else_branch } => {
            out.push_str("CASE");
            for (cond, result) in branches {
                out.push_str(" WHEN ");
                render_expr(cond, out, params);
                out.push_str(" THEN ");
                render_expr(result, out, params);
            }
            if let Some(else_branch) = else_branch {
                out.push_str(" ELSE ");
                render_expr(else_branch, out, params);
            }
            out.push_str(" END");
        }
        SqlExpr::Cast { expr, sql_type } => {
            out.push('(');
            render_expr(expr, out, params);
            out.push_str(")::");
            out.push_str(sql_type);
        }
        SqlExpr::ScalarSubquery(stmt) => {
            out.push('(');
            render_stmt(stmt, out, params);
            out.push(')');
        }
        SqlExpr::Exists(stmt) => {
            out.push_str("EXISTS (");
            render_stmt(stmt, out, params);
            out.push(')');
        }
        SqlExpr::ArraySubquery(stmt) => {
            out.push_str("ARRAY(");
            render_stmt(stmt, out, params);
            out.push(')');
        }
        SqlExpr::JsonBuildObject(fields) => {
            out.push_str("jsonb_build_object(");
            for (i, (key, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('\'');
                out.push_str(&key.replace('\'', "''"));
                out.push_str("', ");
                render_expr(value, out, params);
            }
            out.push(')');
        }
        SqlExpr::Coalesce(args) => {
            out.push_str("COALESCE(");
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_expr(arg, out, params);
            }
            out.push(')');
        }
        SqlExpr::IsNotDistinctFrom { left, right } => {
            out.push('(');
            render_expr(left, out, params);
            out.push_str(" IS NOT DISTINCT FROM ");
            render_expr(right, out, params);
            out.push(')');
        }
        SqlExpr::ArrayLiteral(items) => {
            out.push_str("ARRAY[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_expr(item, out, params);
            }
            out.push(']');
        }
        SqlExpr::Tuple(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_expr(item, out, params);
            }
            out.push(')');
        }
    }
}

fn render_literal(lit: &SqlLiteral, out: &mut String) {
    match lit {
        SqlLiteral::Null => out.push_str("NULL"),
        SqlLiteral::Bool(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
        SqlLiteral::Int(n) => out.push_str(&n.to_string()),
    }
}
