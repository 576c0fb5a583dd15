//! Error kinds for the chain compiler and executor (spec §7).
//!
//! `LookupMiss` and `VariableUnresolved` are deliberately NOT variants here:
//! the spec classifies both as soft outcomes communicated through return
//! values (`Ok(false)` / `Ok(None)`) and [`crate::observer::ChainObserver::on_info`],
//! not as errors.

use thiserror::Error;

/// Failures the chain compiler or executor can raise. Any variant aborts
/// the whole chain and triggers a rollback.
#[derive(Debug, Error)]
pub enum ChainError {
    /// INSERT/UPDATE with empty parameters, UPDATE with an empty WHERE, or
    /// an unsupported statement shape.
    #[error("build error: {0}")]
    Build(String),

    /// The `ConnectionProvider` could not produce a connection.
    #[error("could not open database connection: {0}")]
    Connect(String),

    /// `begin`/`commit`/`rollback` returned `false` or failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// `executeRaw` returned `null` or raised.
    #[error("statement execution failed for sqlID {sql_id}: {message}")]
    Execute { sql_id: String, message: String },
}

/// Failures surfaced by a concrete [`crate::connection::Connection`] /
/// [`crate::connection::ConnectionProvider`] implementation.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("transaction control failed: {0}")]
    Transaction(String),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("unsupported software: {0}")]
    UnsupportedSoftware(String),
}

impl From<ConnectionError> for ChainError {
    fn from(err: ConnectionError) -> Self {
        ChainError::Connect(err.to_string())
    }
}
