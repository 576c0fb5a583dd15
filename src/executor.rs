//! The transactional chain executor (spec §4.7): drives a list of
//! statements through `begin → resolve-variables → execute-non-variable →
//! commit/rollback` on a single [`Connection`], committing or rolling back
//! as one unit.
//!
//! State machine (spec §4.7): `Fresh → (Begin OK?) → Resolving → Executing
//! → (all ok?) → Committing → Done`, with a single absorbing failure state
//! `Aborted` reachable from any step, which always issues a `rollback`.
//! This module doesn't reify that state machine as an enum — the `async fn`
//! control flow below *is* the state machine, the same way the teacher's
//! `CatalogManager` methods express their own control flow directly rather
//! than through an explicit state type.

use crate::chain::DbCommand;
use crate::connection::{Connection, ConnectionProvider, LastId};
use crate::error::ChainError;
use crate::observer::ChainObserver;
use crate::render;
use crate::resolver::ResolveContext;
use crate::statement::Statement;
use crate::value::Value;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// What the executor returns in addition to the spec's bare boolean: the
/// teacher's manager methods return rich results rather than booleans, so
/// this crate follows suit while still treating the chain as "returned
/// `false`" on any failure, exposed via `committed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainOutcome {
    pub committed: bool,
    pub statements_run: usize,
}

impl ChainOutcome {
    fn failed() -> Self {
        ChainOutcome {
            committed: false,
            statements_run: 0,
        }
    }
}

/// Acquires a connection from `provider` and runs `command`'s chain inside
/// one transaction on it.
pub async fn execute(
    command: &mut DbCommand,
    provider: &dyn ConnectionProvider,
    observer: &dyn ChainObserver,
    overrides: Option<&HashMap<String, Value>>,
) -> ChainOutcome {
    let mut connection = match provider.connect(&command.credentials()).await {
        Ok(conn) => conn,
        Err(err) => {
            observer.on_error(&format!("Can't open DB: {err}"));
            return ChainOutcome::failed();
        }
    };
    let outcome = execute_with_connection(command, connection.as_mut(), observer, overrides).await;
    let _ = connection.close().await;
    outcome
}

/// Synchronous wrapper around [`execute`] for callers that cannot themselves
/// be `async` (e.g. an embedded scripting host driving [`crate::commandset::CommandSet`]
/// from a non-async entry point) — the same `block_in_place` +
/// `Handle::current().block_on` shape as the teacher's
/// `SqlxCatalogManager::block_on` in `catalog/sqlx_manager.rs`. Panics if
/// called outside a multi-threaded Tokio runtime, same as its model.
pub fn execute_blocking(
    command: &mut DbCommand,
    provider: &dyn ConnectionProvider,
    observer: &dyn ChainObserver,
    overrides: Option<&HashMap<String, Value>>,
) -> ChainOutcome {
    tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current().block_on(execute(command, provider, observer, overrides))
    })
}

/// Runs `command`'s chain against an already-acquired `connection`. Exposed
/// separately from [`execute`] so callers that manage their own pool
/// checkout (e.g. [`crate::commandset::CommandSet`]) can reuse a connection
/// without this module knowing about pooling.
pub async fn execute_with_connection(
    command: &mut DbCommand,
    connection: &mut dyn Connection,
    observer: &dyn ChainObserver,
    overrides: Option<&HashMap<String, Value>>,
) -> ChainOutcome {
    match connection.begin().await {
        Ok(true) => {}
        Ok(false) => {
            observer.on_error("could not begin transaction");
            return ChainOutcome::failed();
        }
        Err(err) => {
            observer.on_error(&format!("could not begin transaction: {err}"));
            return ChainOutcome::failed();
        }
    }
    observer.on_info("Started transaction");

    let mut resolved: HashMap<String, Value> = HashMap::new();
    if let Err(err) = resolve_all_variables(
        &mut command.statements,
        connection,
        &command.properties,
        overrides,
        &mut resolved,
        observer,
    )
    .await
    {
        observer.on_error(&err.to_string());
        let _ = connection.rollback().await;
        return ChainOutcome::failed();
    }

    let mut statements_run = 0usize;
    for i in 0..command.statements.len() {
        if command.statements[i].is_variable_statement() {
            continue;
        }
        match execute_one(&mut command.statements, i, connection, &resolved).await {
            Ok(()) => {
                statements_run += 1;
                observer.on_info(&format!("SQL executed: {}", command.statements[i].describe()));
            }
            Err(err) => {
                observer.on_error(&err.to_string());
                let _ = connection.rollback().await;
                return ChainOutcome::failed();
            }
        }
    }

    match connection.commit().await {
        Ok(true) => {
            observer.on_info("Commit transaction: OK");
            ChainOutcome {
                committed: true,
                statements_run,
            }
        }
        Ok(false) => {
            observer.on_info("Commit transaction: FAILED");
            let _ = connection.rollback().await;
            ChainOutcome::failed()
        }
        Err(err) => {
            observer.on_error(&format!("commit failed: {err}"));
            let _ = connection.rollback().await;
            ChainOutcome::failed()
        }
    }
}

/// Builds the `(table, sqlId) → index` lookup the resolver needs for
/// back-references, over whatever statements have executed so far (spec §9:
/// "an arena of statements owned by the chain… a `HashMap<(table, sqlId),
/// index>` rebuilt once per chain"). Rebuilding it before each statement is
/// simpler than threading incremental updates through the loop and costs
/// little for chain lengths in the hundreds.
fn build_executed_index(statements: &[Statement]) -> HashMap<(String, String), usize> {
    statements
        .iter()
        .enumerate()
        .filter(|(_, s)| s.executed)
        .map(|(idx, s)| ((s.table.clone(), s.sql_id.clone()), idx))
        .collect()
}

/// Renders and runs the one statement at `index`, writing its result slots
/// back. Render happens under an immutable borrow of the whole statement
/// list (for back-reference lookups); that borrow ends before the mutable
/// write-back, so there's no conflict despite both touching `statements`.
async fn execute_one(
    statements: &mut [Statement],
    index: usize,
    connection: &mut dyn Connection,
    resolved: &HashMap<String, Value>,
) -> Result<(), ChainError> {
    let rendered = {
        let executed_index = build_executed_index(statements);
        let ctx = ResolveContext::new(resolved, statements, &executed_index);
        render::render(&statements[index], connection.dialect(), &ctx)?
    };

    statements[index].rendered_sql = Some(rendered.sql.clone());

    let outcome = connection
        .execute_raw(&rendered.sql)
        .await
        .map_err(|err| execute_error(&statements[index], err.to_string()))?
        .ok_or_else(|| execute_error(&statements[index], "statement returned no result".to_string()))?;

    statements[index].last_id = resolve_last_id(
        outcome.last_id.as_ref(),
        &statements[index],
        &rendered.values_named,
    );
    statements[index].results = outcome.results;
    statements[index].executed = true;
    Ok(())
}

fn execute_error(statement: &Statement, message: String) -> ChainError {
    ChainError::Execute {
        sql_id: statement.sql_id.clone(),
        message,
    }
}

/// The variable-binding pass (spec §4.5): runs every variable-producing
/// statement in declaration order, binds its name to the first non-null
/// value of its first result row's first column (falling back to
/// `properties`/`overrides`), then propagates bound values into every
/// statement's own `variables` map.
///
/// Open question (recorded in `DESIGN.md`): the spec's "find every statement
/// whose sqlId is `%N%`" implies more than one producer is possible for the
/// same name. This implementation keeps the first non-null value seen and
/// still executes every matching statement (so later back-references to it
/// resolve), rather than stopping at the first match.
async fn resolve_all_variables(
    statements: &mut [Statement],
    connection: &mut dyn Connection,
    properties: &HashMap<String, Value>,
    overrides: Option<&HashMap<String, Value>>,
    resolved: &mut HashMap<String, Value>,
    observer: &dyn ChainObserver,
) -> Result<(), ChainError> {
    for i in 0..statements.len() {
        if !statements[i].is_variable_statement() {
            continue;
        }
        let rendered = {
            let executed_index = build_executed_index(statements);
            let ctx = ResolveContext::new(resolved, statements, &executed_index);
            render::render(&statements[i], connection.dialect(), &ctx)?
        };
        statements[i].rendered_sql = Some(rendered.sql.clone());

        let outcome = connection
            .execute_raw(&rendered.sql)
            .await
            .map_err(|err| execute_error(&statements[i], err.to_string()))?
            .ok_or_else(|| execute_error(&statements[i], "variable statement returned no result".to_string()))?;

        let name = statements[i]
            .produced_variable_name()
            .expect("is_variable_statement implies a name")
            .to_string();

        statements[i].last_id = resolve_last_id(outcome.last_id.as_ref(), &statements[i], &rendered.values_named);
        statements[i].results = outcome.results;
        statements[i].executed = true;

        observer.on_info(&format!("Executed SQL for variable {name}"));

        if !resolved.contains_key(&name) {
            let value = first_row_first_column(&statements[i].results)
                .or_else(|| properties.get(&name).cloned())
                .or_else(|| overrides.and_then(|o| o.get(&name).cloned()));
            resolved.insert(name, value.unwrap_or(Value::Null));
        }
    }

    // Names required by non-variable statements with no matching
    // `%NAME%` producer still resolve from properties/overrides.
    // Back-reference names (`table:sqlId`, surfaced by `required_variables`
    // alongside plain `%NAME%`s) are skipped: those resolve through
    // `executed_index`, never through this map.
    for stmt in statements.iter() {
        if stmt.is_variable_statement() {
            continue;
        }
        for name in stmt.required_variables() {
            if name.contains(':') || resolved.contains_key(&name) {
                continue;
            }
            let value = properties
                .get(&name)
                .or_else(|| overrides.and_then(|o| o.get(&name)))
                .cloned()
                .unwrap_or(Value::Null);
            resolved.insert(name, value);
        }
    }

    // Propagate bindings back into each statement's declared `variables` map.
    for stmt in statements.iter_mut() {
        for (name, slot) in stmt.variables.iter_mut() {
            if slot.is_none() {
                if let Some(value) = resolved.get(name) {
                    *slot = Some(value.clone());
                }
            }
        }
    }

    Ok(())
}

/// First non-null value of the first result row's first column — the
/// standard variable-resolver callback's extraction rule (spec §4.5). Row
/// storage is a `BTreeMap`, so "first column" means lexicographically first
/// key; in practice a variable-producing SELECT projects exactly one
/// (possibly aliased) column, so this never matters in the statements
/// observed in practice.
fn first_row_first_column(results: &[crate::statement::RowMap]) -> Option<Value> {
    let row = results.first()?;
    let value = row.values().next()?;
    if matches!(value, Value::Null) {
        None
    } else {
        Some(value.clone())
    }
}

static ARITHMETIC_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)\s*([+-])\s*(-?\d+)$").unwrap());

/// `resolveLastId` (spec §4.7): decides which value becomes the logical
/// "last inserted id" exposed to later `#table:sqlId#` references.
pub(crate) fn resolve_last_id(
    driver_returned_id: Option<&LastId>,
    statement: &Statement,
    values_named: &HashMap<String, Value>,
) -> Option<Value> {
    if let Some(value) = non_empty_driver_id(driver_returned_id) {
        return Some(value);
    }

    let (column, _) = statement.return_columns.iter().next()?;
    let value = values_named
        .get(column)
        .or_else(|| statement.parameters.get(column))?;

    match value {
        Value::Int(i) => Some(Value::Int(*i)),
        _ => {
            if let Some(raw) = value.as_raw_fragment() {
                evaluate_raw_fragment(raw)
            } else {
                value.as_i64().map(Value::Int)
            }
        }
    }
}

fn non_empty_driver_id(id: Option<&LastId>) -> Option<Value> {
    match id {
        Some(LastId::Int(n)) if *n != 0 => Some(Value::Int(*n)),
        Some(LastId::Text(s)) if !s.is_empty() => Some(Value::Text(s.clone())),
        _ => None,
    }
}

fn evaluate_raw_fragment(raw: &Value) -> Option<Value> {
    let text = raw.stringify();
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Int(i));
    }
    let caps = ARITHMETIC_FRAGMENT.captures(trimmed)?;
    let a: i64 = caps[1].parse().ok()?;
    let b: i64 = caps[3].parse().ok()?;
    Some(Value::Int(if &caps[2] == "+" { a + b } else { a - b }))
}
