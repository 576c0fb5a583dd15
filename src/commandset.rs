//! The host-facing surface (spec §4.8): a named collection of [`DbCommand`]s,
//! the API an embedded scripting runtime (or any other caller) drives
//! instead of touching [`crate::executor`] directly.
//!
//! Every lookup miss here is soft — log and return `false`/`None`, never
//! `Err` — per the "LookupMiss" row of the error policy table; only the
//! chain executor itself raises [`ChainError`].

use crate::connection::ConnectionProvider;
use crate::error::ChainError;
use crate::executor;
use crate::observer::ChainObserver;
use crate::statement::RowMap;
use crate::value::Value;
use crate::DbCommand;
use std::collections::HashMap;
use std::sync::Arc;

/// A named set of chains plus the provider cache used to run them.
///
/// `providers` is keyed by `software` (`"postgres"`, `"mysql"`, ...) rather
/// than by command id, mirroring the teacher's `connections` table keyed by
/// connection name in `CatalogManager` — many commands on the same database
/// kind share one provider.
pub struct CommandSet {
    commands: HashMap<String, DbCommand>,
    providers: HashMap<String, Arc<dyn ConnectionProvider>>,
    observer: Arc<dyn ChainObserver>,
}

impl CommandSet {
    pub fn new(observer: Arc<dyn ChainObserver>) -> Self {
        CommandSet {
            commands: HashMap::new(),
            providers: HashMap::new(),
            observer,
        }
    }

    /// Registers `command` under `id`, replacing whatever was there before.
    pub fn insert(&mut self, id: impl Into<String>, command: DbCommand) {
        self.commands.insert(id.into(), command);
    }

    /// Registers the `ConnectionProvider` used for every command whose
    /// `software` field equals `software`.
    pub fn register_provider(&mut self, software: impl Into<String>, provider: Arc<dyn ConnectionProvider>) {
        self.providers.insert(software.into(), provider);
    }

    /// Runs the whole chain registered under `id`.
    pub async fn execute_db_command_by_id(
        &mut self,
        id: &str,
        overrides: Option<&HashMap<String, Value>>,
    ) -> bool {
        let Some(command) = self.commands.get_mut(id) else {
            self.observer.on_info(&format!("no DBCommand registered for id {id}"));
            return false;
        };
        let Some(provider) = self.providers.get(&command.software) else {
            self.observer
                .on_info(&format!("no connection provider registered for software {}", command.software));
            return false;
        };
        executor::execute(command, provider.as_ref(), self.observer.as_ref(), overrides)
            .await
            .committed
    }

    /// Runs just the one statement identified by `sql_id`, inside a
    /// transaction scoped to its own owning command — not the whole chain.
    pub async fn execute_sql_by_id(&mut self, sql_id: &str, overrides: Option<&HashMap<String, Value>>) -> bool {
        self.execute_sqls_by_ids(&[sql_id.to_string()], overrides).await
    }

    /// Groups `sql_ids` by owning command and runs each group in its own
    /// transaction. Any group's failure short-circuits the remaining groups
    /// (spec §4.8); groups already run keep whatever they committed.
    pub async fn execute_sqls_by_ids(
        &mut self,
        sql_ids: &[String],
        overrides: Option<&HashMap<String, Value>>,
    ) -> bool {
        let mut by_command: Vec<(String, Vec<String>)> = Vec::new();
        for sql_id in sql_ids {
            let Some(owner) = self.owning_command_id(sql_id) else {
                self.observer.on_info(&format!("no statement registered for sqlID {sql_id}"));
                return false;
            };
            match by_command.iter_mut().find(|(id, _)| *id == owner) {
                Some((_, ids)) => ids.push(sql_id.clone()),
                None => by_command.push((owner, vec![sql_id.clone()])),
            }
        }

        for (command_id, ids) in by_command {
            let Some(command) = self.commands.get(&command_id) else {
                continue;
            };
            let software = command.software.clone();
            let Some(provider) = self.providers.get(&software).cloned() else {
                self.observer
                    .on_info(&format!("no connection provider registered for software {software}"));
                return false;
            };

            let command = self.commands.get_mut(&command_id).expect("checked above");
            let subset = match extract_subset(command, &ids) {
                Ok(subset) => subset,
                Err(err) => {
                    self.observer.on_info(&err.to_string());
                    return false;
                }
            };
            let mut scoped = subset;
            let outcome =
                executor::execute(&mut scoped, provider.as_ref(), self.observer.as_ref(), overrides).await;
            write_back(command, &scoped);
            if !outcome.committed {
                return false;
            }
        }
        true
    }

    fn owning_command_id(&self, sql_id: &str) -> Option<String> {
        self.commands
            .iter()
            .find(|(_, cmd)| cmd.statement_by_sql_id(sql_id).is_some())
            .map(|(id, _)| id.clone())
    }

    /// All result rows of the statement `sql_id` ran last, or `None` if it
    /// hasn't executed (unknown id or never run).
    pub fn get_sql_results(&self, sql_id: &str) -> Option<&[RowMap]> {
        self.find_statement(sql_id)
            .filter(|s| s.executed)
            .map(|s| s.results.as_slice())
    }

    /// The first result row of the statement `sql_id` ran last.
    pub fn get_sql_result(&self, sql_id: &str) -> Option<&RowMap> {
        self.get_sql_results(sql_id).and_then(|rows| rows.first())
    }

    /// `column` from every result row of the statement `sql_id` ran last.
    pub fn get_sql_results_column(&self, sql_id: &str, column: &str) -> Option<Vec<Value>> {
        let rows = self.get_sql_results(sql_id)?;
        Some(rows.iter().filter_map(|row| row.get(column).cloned()).collect())
    }

    /// `column` from the first result row of the statement `sql_id` ran last.
    pub fn get_sql_result_column(&self, sql_id: &str, column: &str) -> Option<Value> {
        self.get_sql_result(sql_id)?.get(column).cloned()
    }

    /// A property of whichever command owns `sql_id`'s command-level
    /// `properties` map (spec: `getProperty(key)` reads the owning
    /// command's properties, keyed by the caller's current command context;
    /// here the caller names the command directly since `CommandSet` has no
    /// implicit "current command").
    pub fn get_property(&self, command_id: &str, key: &str) -> Option<Value> {
        self.commands.get(command_id)?.properties.get(key).cloned()
    }

    fn find_statement(&self, sql_id: &str) -> Option<&crate::statement::Statement> {
        self.commands.values().find_map(|cmd| cmd.statement_by_sql_id(sql_id))
    }
}

/// Builds a scratch `DbCommand` carrying only the statements in `ids` (same
/// credentials/properties as `command`), so a sub-group of a chain can run
/// in its own transaction without disturbing the rest.
fn extract_subset(command: &DbCommand, ids: &[String]) -> Result<DbCommand, ChainError> {
    let statements = ids
        .iter()
        .map(|id| {
            command
                .statement_by_sql_id(id)
                .cloned()
                .ok_or_else(|| ChainError::Build(format!("no statement registered for sqlID {id}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DbCommand {
        id: command.id.clone(),
        host: command.host.clone(),
        port: command.port,
        user: command.user.clone(),
        pass: command.pass.clone(),
        dbname: command.dbname.clone(),
        software: command.software.clone(),
        properties: command.properties.clone(),
        statements,
    })
}

/// Copies result slots from a scoped sub-chain back onto the statements of
/// the owning command they were extracted from.
fn write_back(command: &mut DbCommand, scoped: &DbCommand) {
    for stmt in &scoped.statements {
        if let Some(idx) = command.statement_index_by_sql_id(&stmt.sql_id) {
            command.statements[idx].results = stmt.results.clone();
            command.statements[idx].last_id = stmt.last_id.clone();
            command.statements[idx].executed = stmt.executed;
            command.statements[idx].rendered_sql = stmt.rendered_sql.clone();
        }
    }
}
