//! The variable / reference resolver (spec §4.5): binds `%NAME%` placeholders
//! and rewrites `#table:sqlId#` back-references into the values produced by
//! already-executed statements.

use crate::statement::Statement;
use crate::value::Value;
use indexmap::IndexSet;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `%NAME%` — a named variable placeholder.
static VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%").unwrap());

/// `#table:id#` — a back-reference to an already-executed statement.
static REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([^:#]+):([^:#]+)#").unwrap());

static EMPTY_VARS: LazyLock<HashMap<String, Value>> = LazyLock::new(HashMap::new);
static EMPTY_INDEX: LazyLock<HashMap<(String, String), usize>> = LazyLock::new(HashMap::new);

/// True if `s` contains either placeholder grammar from spec §4.3.
pub fn contains_placeholder(s: &str) -> bool {
    VAR_RE.is_match(s) || REF_RE.is_match(s)
}

/// Adds every placeholder name found in `value` to `out`, preserving order
/// of first appearance. Named variables contribute their bare name;
/// back-references contribute `table:sqlId` (matching
/// `Condition::required_variables`'s behavior of surfacing both kinds
/// through one set).
pub fn collect_variable_names(value: &Value, out: &mut IndexSet<String>) {
    match value {
        Value::Text(s) => {
            for cap in VAR_RE.captures_iter(s) {
                out.insert(cap[1].to_string());
            }
            for cap in REF_RE.captures_iter(s) {
                out.insert(format!("{}:{}", &cap[1], &cap[2]));
            }
        }
        Value::List(items) => {
            for item in items {
                collect_variable_names(item, out);
            }
        }
        _ => {}
    }
}

/// Everything the substitution pass needs: bound variables from the binding
/// pass, and an index over already-executed statements for back-references.
pub struct ResolveContext<'a> {
    pub variables: &'a HashMap<String, Value>,
    pub statements: &'a [Statement],
    pub executed_index: &'a HashMap<(String, String), usize>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        variables: &'a HashMap<String, Value>,
        statements: &'a [Statement],
        executed_index: &'a HashMap<(String, String), usize>,
    ) -> Self {
        ResolveContext {
            variables,
            statements,
            executed_index,
        }
    }

    /// A context with nothing bound, used by unit tests that only exercise
    /// predicate rendering on literal values.
    pub fn empty() -> ResolveContext<'static> {
        ResolveContext {
            variables: &EMPTY_VARS,
            statements: &[],
            executed_index: &EMPTY_INDEX,
        }
    }

    /// The value a back-reference `#table:sqlId#` resolves to: `lastId` if
    /// the referenced statement produced one, else its full result set.
    fn back_reference_value(&self, table: &str, sql_id: &str) -> Option<Value> {
        let idx = *self.executed_index.get(&(table.to_string(), sql_id.to_string()))?;
        let stmt = self.statements.get(idx)?;
        if let Some(last_id) = &stmt.last_id {
            Some(last_id.clone())
        } else {
            Some(Value::List(
                stmt.results
                    .iter()
                    .map(|row| Value::Map(row.clone()))
                    .collect(),
            ))
        }
    }
}

/// Substitutes every `%NAME%` and `#table:id#` occurrence in `value`,
/// recursing element-wise into lists so the raw-fragment shape survives.
pub fn substitute_value(value: &Value, ctx: &ResolveContext) -> Value {
    match value {
        Value::Text(s) => substitute_string(s, ctx),
        Value::List(items) => {
            Value::List(items.iter().map(|item| substitute_value(item, ctx)).collect())
        }
        other => other.clone(),
    }
}

fn substitute_string(s: &str, ctx: &ResolveContext) -> Value {
    if let Some(cap) = VAR_RE.captures(s) {
        if cap.get(0).unwrap().as_str() == s {
            return ctx.variables.get(&cap[1]).cloned().unwrap_or(Value::Null);
        }
    }
    if let Some(cap) = REF_RE.captures(s) {
        if cap.get(0).unwrap().as_str() == s {
            return ctx
                .back_reference_value(&cap[1], &cap[2])
                .unwrap_or(Value::Null);
        }
    }
    if !contains_placeholder(s) {
        return Value::Text(s.to_string());
    }

    let replaced = VAR_RE.replace_all(s, |cap: &regex::Captures| {
        ctx.variables
            .get(&cap[1])
            .map(Value::stringify)
            .unwrap_or_else(|| "null".to_string())
    });
    let replaced = REF_RE.replace_all(&replaced, |cap: &regex::Captures| {
        ctx.back_reference_value(&cap[1], &cap[2])
            .map(|v| v.stringify())
            .unwrap_or_else(|| "null".to_string())
    });
    Value::Text(replaced.to_string())
}
