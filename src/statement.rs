//! The abstract representation of a single SQL statement: its shape,
//! parameters, predicate, and the execution-time result slots the chain
//! executor fills in.

use crate::condition::Condition;
use crate::resolver;
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single result row, keyed by column name. A `BTreeMap` (rather than a
/// `HashMap`) keeps key order deterministic so result values that round-trip
/// through JSON (e.g. via a back-reference's `results` fallback) serialize
/// identically on every run.
pub type RowMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Insert,
    Update,
    Select,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Select => "SELECT",
            StatementKind::Delete => "DELETE",
        }
    }
}

/// A statement in a chain. Construction is pure data; the result slots
/// (`results`, `last_id`, `executed`, `rendered_sql`) default empty and are
/// mutated only by the chain executor, never by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "sqlID")]
    pub sql_id: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: StatementKind,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Condition>,
    #[serde(rename = "returnColumns", default)]
    pub return_columns: IndexMap<String, Option<String>>,
    #[serde(rename = "returnLastID", default)]
    pub return_last_id: bool,
    #[serde(rename = "orderBy", default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
    #[serde(default)]
    pub variables: IndexMap<String, Option<Value>>,

    #[serde(skip)]
    pub results: Vec<RowMap>,
    #[serde(skip)]
    pub last_id: Option<Value>,
    #[serde(skip)]
    pub executed: bool,
    #[serde(skip)]
    pub rendered_sql: Option<String>,
}

impl Statement {
    pub fn new(sql_id: impl Into<String>, table: impl Into<String>, kind: StatementKind) -> Self {
        Statement {
            sql_id: sql_id.into(),
            table: table.into(),
            kind,
            predicate: None,
            return_columns: IndexMap::new(),
            return_last_id: false,
            order_by: None,
            limit: None,
            parameters: IndexMap::new(),
            variables: IndexMap::new(),
            results: Vec::new(),
            last_id: None,
            executed: false,
            rendered_sql: None,
        }
    }

    /// A statement whose `sqlId` has the shape `%NAME%` is a
    /// variable-producing statement: it runs only during the binding pass.
    pub fn is_variable_statement(&self) -> bool {
        is_variable_sql_id(&self.sql_id)
    }

    /// The variable name this statement produces, if it is variable-producing.
    pub fn produced_variable_name(&self) -> Option<&str> {
        if self.is_variable_statement() {
            Some(&self.sql_id[1..self.sql_id.len() - 1])
        } else {
            None
        }
    }

    /// Union of `variables.keys`, the predicate's required variables, and
    /// placeholders found in `parameters` values, in order of first
    /// appearance (`variables` first, then the predicate, then parameters —
    /// matching declaration order in the wire format).
    pub fn required_variables(&self) -> IndexSet<String> {
        let mut out: IndexSet<String> = self.variables.keys().cloned().collect();
        if let Some(predicate) = &self.predicate {
            out.extend(predicate.required_variables());
        }
        for value in self.parameters.values() {
            resolver::collect_variable_names(value, &mut out);
        }
        out
    }

    /// A short human-readable label for log lines, e.g. `"INSERT 11 on order"`.
    pub fn describe(&self) -> String {
        format!("{} {} on {}", self.kind.as_str(), self.sql_id, self.table)
    }

    /// After successful execution, the value a later statement's
    /// `#table:sqlId#` reference resolves to: `lastId` if set, else results.
    pub fn reference_value(&self) -> Value {
        if let Some(last_id) = &self.last_id {
            last_id.clone()
        } else {
            Value::List(self.results.iter().map(|row| Value::Map(row.clone())).collect())
        }
    }
}

pub fn is_variable_sql_id(sql_id: &str) -> bool {
    sql_id.len() >= 2 && sql_id.starts_with('%') && sql_id.ends_with('%')
}
