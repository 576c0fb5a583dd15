//! Produces the final SQL text for a statement by composing the predicate
//! tree, dialect, and variable resolver.

use crate::condition::render_sql_value;
use crate::dialect::Dialect;
use crate::error::ChainError;
use crate::resolver::{self, ResolveContext};
use crate::statement::{Statement, StatementKind};
use crate::value::Value;
use std::collections::HashMap;

/// The rendered form of a statement. `values_ordered`/`values_named` carry
/// the substituted parameter values alongside the inlined SQL text — the
/// spec's contract inlines everything today, but keeps these maps available
/// for a future driver-bound (prepared-parameter) rendering path.
#[derive(Debug, Clone)]
pub struct RenderedStatement {
    pub sql: String,
    pub values_ordered: Vec<Value>,
    pub values_named: HashMap<String, Value>,
}

/// Renders `statement` into SQL text for `dialect`, substituting variables
/// and back-references via `ctx`.
pub fn render(
    statement: &Statement,
    dialect: &dyn Dialect,
    ctx: &ResolveContext,
) -> Result<RenderedStatement, ChainError> {
    match statement.kind {
        StatementKind::Insert => render_insert(statement, dialect, ctx),
        StatementKind::Update => render_update(statement, dialect, ctx),
        StatementKind::Select => render_select(statement, dialect, ctx),
        StatementKind::Delete => render_delete(statement, dialect, ctx),
    }
}

fn substituted_parameters(
    statement: &Statement,
    ctx: &ResolveContext,
) -> (Vec<(String, Value)>, HashMap<String, Value>) {
    let mut ordered = Vec::with_capacity(statement.parameters.len());
    let mut named = HashMap::with_capacity(statement.parameters.len());
    for (col, value) in &statement.parameters {
        let resolved = resolver::substitute_value(value, ctx);
        ordered.push((col.clone(), resolved.clone()));
        named.insert(col.clone(), resolved);
    }
    (ordered, named)
}

fn render_insert(
    statement: &Statement,
    dialect: &dyn Dialect,
    ctx: &ResolveContext,
) -> Result<RenderedStatement, ChainError> {
    if statement.parameters.is_empty() {
        return Err(ChainError::Build(format!(
            "INSERT {} requires non-empty parameters",
            statement.sql_id
        )));
    }
    let (ordered, named) = substituted_parameters(statement, ctx);

    let columns = ordered
        .iter()
        .map(|(col, _)| dialect.quote_ident(col))
        .collect::<Vec<_>>()
        .join(" , ");
    let values = ordered
        .iter()
        .map(|(_, v)| render_sql_value(v, dialect))
        .collect::<Vec<_>>()
        .join(" , ");

    let mut sql = format!(
        "INSERT INTO {} ({columns}) VALUES ({values})",
        dialect.quote_ident(&statement.table)
    );

    // Postgres has no session-wide "last inserted id" to query after the
    // fact; ask for the id column back explicitly instead (spec §2/§4.4's
    // "RETURNING vs LAST_INSERT_ID" dialect responsibility). MySQL/SQLite
    // report it natively through the driver, so they never take this path.
    if statement.return_last_id && dialect.needs_returning_clause() {
        if let Some((column, _)) = statement.return_columns.iter().next() {
            sql.push_str(&format!(" RETURNING {}", dialect.quote_ident(column)));
        }
    }

    Ok(RenderedStatement {
        sql,
        values_ordered: ordered.into_iter().map(|(_, v)| v).collect(),
        values_named: named,
    })
}

fn render_update(
    statement: &Statement,
    dialect: &dyn Dialect,
    ctx: &ResolveContext,
) -> Result<RenderedStatement, ChainError> {
    if statement.parameters.is_empty() {
        return Err(ChainError::Build(format!(
            "UPDATE {} requires non-empty parameters",
            statement.sql_id
        )));
    }
    let predicate = statement.predicate.as_ref().ok_or_else(|| {
        ChainError::Build(format!("UPDATE {} requires a WHERE clause", statement.sql_id))
    })?;
    let where_sql = predicate.build(dialect, ctx);
    if where_sql.trim().is_empty() {
        return Err(ChainError::Build(format!(
            "UPDATE {} requires a non-empty rendered WHERE",
            statement.sql_id
        )));
    }

    let (ordered, named) = substituted_parameters(statement, ctx);
    let assignments = ordered
        .iter()
        .map(|(col, v)| format!("{} = {}", dialect.quote_ident(col), render_sql_value(v, dialect)))
        .collect::<Vec<_>>()
        .join(" , ");

    let sql = format!(
        "UPDATE {} SET {assignments} WHERE {where_sql}",
        dialect.quote_ident(&statement.table)
    );

    Ok(RenderedStatement {
        sql,
        values_ordered: ordered.into_iter().map(|(_, v)| v).collect(),
        values_named: named,
    })
}

fn render_select(
    statement: &Statement,
    dialect: &dyn Dialect,
    ctx: &ResolveContext,
) -> Result<RenderedStatement, ChainError> {
    let cols = render_projection(statement, dialect);
    let mut sql = format!(
        "SELECT {cols} FROM {}",
        dialect.quote_ident(&statement.table)
    );
    if let Some(predicate) = &statement.predicate {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate.build(dialect, ctx));
    }
    if let Some(order_by) = &statement.order_by {
        sql.push(' ');
        sql.push_str(&render_order_by(order_by, dialect));
    }
    if let Some(limit_sql) = render_limit(statement.limit) {
        sql.push(' ');
        sql.push_str(&limit_sql);
    }

    Ok(RenderedStatement {
        sql,
        values_ordered: Vec::new(),
        values_named: HashMap::new(),
    })
}

fn render_delete(
    statement: &Statement,
    dialect: &dyn Dialect,
    ctx: &ResolveContext,
) -> Result<RenderedStatement, ChainError> {
    let mut sql = format!("DELETE FROM {}", dialect.quote_ident(&statement.table));
    if let Some(predicate) = &statement.predicate {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate.build(dialect, ctx));
    }
    if let Some(limit_sql) = render_limit(statement.limit) {
        sql.push(' ');
        sql.push_str(&limit_sql);
    }

    Ok(RenderedStatement {
        sql,
        values_ordered: Vec::new(),
        values_named: HashMap::new(),
    })
}

fn render_projection(statement: &Statement, dialect: &dyn Dialect) -> String {
    if statement.return_columns.is_empty() {
        return "*".to_string();
    }
    statement
        .return_columns
        .iter()
        .map(|(col, alias)| match alias {
            Some(alias) => format!(
                "{} as {}",
                dialect.quote_ident(col),
                dialect.quote_ident(alias)
            ),
            None => dialect.quote_ident(col),
        })
        .collect::<Vec<_>>()
        .join(" , ")
}

/// Leading `>` means DESC, `<` or bare identifier means ASC (no keyword emitted).
fn render_order_by(order_by: &str, dialect: &dyn Dialect) -> String {
    let (column, desc) = match order_by.strip_prefix('>') {
        Some(rest) => (rest, true),
        None => (order_by.strip_prefix('<').unwrap_or(order_by), false),
    };
    if desc {
        format!("ORDER BY {} DESC", dialect.quote_ident(column))
    } else {
        format!("ORDER BY {}", dialect.quote_ident(column))
    }
}

fn render_limit(limit: Option<i64>) -> Option<String> {
    match limit {
        Some(n) if n > 0 => Some(format!("LIMIT {n}")),
        _ => None,
    }
}
