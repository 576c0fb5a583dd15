//! A transactional executor for declaratively-described chains of SQL
//! statements: given a `DBCommand` document (credentials, dialect selector,
//! an ordered statement list, free-form properties) this crate renders,
//! resolves cross-statement variables and back-references for, and runs
//! every statement against a remote database inside one transaction.

pub mod chain;
pub mod commandset;
pub mod condition;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod mock;
pub mod observer;
pub mod pool;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod statement;
pub mod value;

pub use chain::DbCommand;
pub use commandset::CommandSet;
pub use condition::Condition;
pub use connection::{Connection, ConnectionCredentials, ConnectionProvider, ExecuteOutcome, LastId};
pub use dialect::Dialect;
pub use error::{ChainError, ConnectionError};
pub use executor::{execute, execute_blocking, execute_with_connection, ChainOutcome};
pub use observer::{ChainObserver, NullObserver, TracingObserver};
pub use statement::{Statement, StatementKind};
pub use value::Value;
