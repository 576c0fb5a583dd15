//! The external `Connection` / `ConnectionProvider` contract the chain
//! executor depends on (spec §6). Concrete database bindings are external
//! collaborators behind this interface; the core never assumes a specific
//! client library.

use crate::dialect::Dialect;
use crate::error::ConnectionError;
use crate::statement::RowMap;
use async_trait::async_trait;

/// The driver-reported insert id, before [`crate::executor::resolve_last_id`]'s
/// policy (native id, column value, or arithmetic fragment) runs.
#[derive(Debug, Clone, PartialEq)]
pub enum LastId {
    Int(i64),
    Text(String),
}

/// What `executeRaw` hands back for one statement: its result rows (if any)
/// and whatever the driver reports as the "last inserted id". `None` for
/// `last_id` means the driver doesn't track one for this statement — e.g.
/// any statement that isn't an INSERT, or a Postgres INSERT whose dialect
/// didn't ask for a `RETURNING` clause in the first place.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOutcome {
    pub results: Vec<RowMap>,
    pub last_id: Option<LastId>,
}

/// Connection credentials parsed from a chain document (spec §3, §6).
#[derive(Debug, Clone)]
pub struct ConnectionCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub dbname: String,
    pub software: String,
}

/// A single connection to a target database, driven by the chain executor.
///
/// Every method is a suspension point (spec §5): the executor awaits each
/// one and never interleaves other work on the same chain while waiting.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn begin(&mut self) -> Result<bool, ConnectionError>;
    async fn commit(&mut self) -> Result<bool, ConnectionError>;
    async fn rollback(&mut self) -> Result<bool, ConnectionError>;

    /// Runs one already-rendered SQL statement. `Ok(None)` is the spec's
    /// "executeRaw returns null" soft failure; `Err` is a driver-level
    /// exception. Both abort the chain with a rollback.
    async fn execute_raw(&mut self, sql: &str) -> Result<Option<ExecuteOutcome>, ConnectionError>;

    /// The dialect this connection renders statements for.
    fn dialect(&self) -> &dyn Dialect;

    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Produces a [`Connection`] for a given set of credentials. One instance
/// typically backs one `(software, host, port, user, dbname)` key, pooled
/// by [`crate::pool::ConnectionPool`] and looked up by `software` through
/// [`crate::registry`].
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(&self, creds: &ConnectionCredentials) -> Result<Box<dyn Connection>, ConnectionError>;
}
