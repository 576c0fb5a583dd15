//! Loads a [`DbCommand`] chain document from disk (spec §6 `[EXPANSION]`):
//! JSON or TOML, format auto-detected from the file extension, via the
//! `config` crate — already the teacher's dependency of choice for its own
//! `AppConfig::load`/`validate` pair in `bin/server.rs`.

use crate::chain::DbCommand;
use crate::error::ChainError;
use std::collections::HashSet;
use std::path::Path;

/// Reads and deserializes the chain document at `path`. The file extension
/// (`.json`, `.toml`, `.yaml`/`.yml`) selects the format; anything else is
/// treated as JSON, the wire format's primary shape (spec §6).
pub fn load(path: impl AsRef<Path>) -> Result<DbCommand, ChainError> {
    let path = path.as_ref();
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => config::FileFormat::Toml,
        Some("yaml") | Some("yml") => config::FileFormat::Yaml,
        _ => config::FileFormat::Json,
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(path).format(format))
        .build()
        .map_err(|err| ChainError::Build(format!("could not load chain document: {err}")))?;

    settings
        .try_deserialize()
        .map_err(|err| ChainError::Build(format!("could not parse chain document: {err}")))
}

/// Structural checks independent of rendering a specific statement
/// (spec §6/§9): non-empty credentials, non-empty statement list, and
/// unique `sqlID`s — `CommandSet` and back-reference resolution both
/// assume a chain has no two statements sharing one id.
pub fn validate(command: &DbCommand) -> Result<(), ChainError> {
    if command.host.is_empty() {
        return Err(ChainError::Build("DBCommand.host must not be empty".to_string()));
    }
    if command.user.is_empty() {
        return Err(ChainError::Build("DBCommand.user must not be empty".to_string()));
    }
    if command.dbname.is_empty() {
        return Err(ChainError::Build("DBCommand.db must not be empty".to_string()));
    }
    if command.statements.is_empty() {
        return Err(ChainError::Build("DBCommand.sqls must not be empty".to_string()));
    }

    let mut seen = HashSet::new();
    for statement in &command.statements {
        if statement.table.is_empty() {
            return Err(ChainError::Build(format!(
                "statement {} has an empty table",
                statement.sql_id
            )));
        }
        if !seen.insert(&statement.sql_id) {
            return Err(ChainError::Build(format!(
                "duplicate sqlID {} in chain",
                statement.sql_id
            )));
        }
    }

    Ok(())
}
