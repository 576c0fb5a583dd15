//! Concrete database bindings. The core (`executor`, `render`, `resolver`,
//! ...) only ever sees [`crate::connection::Connection`]; this module is
//! this crate's one production implementation of that trait, per the
//! "ambient stack regardless of non-goals" rule — `sqlx` is already the
//! teacher's dependency for exactly this job.

pub mod sqlx_driver;

pub use sqlx_driver::{
    MySqlConnection, MySqlConnectionProvider, PostgresConnection, PostgresConnectionProvider,
    SqliteConnection, SqliteConnectionProvider,
};

use crate::connection::ConnectionProvider;
use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
use crate::registry::{self, ConnectionProviderFactory};
use std::sync::Arc;

macro_rules! sqlx_factory {
    ($name:ident, $provider:ident, $dialect:ty) => {
        struct $name;

        impl ConnectionProviderFactory for $name {
            fn provider(&self) -> Arc<dyn ConnectionProvider> {
                Arc::new($provider)
            }

            fn dialect(&self) -> Arc<dyn Dialect> {
                Arc::new(<$dialect>::default())
            }
        }
    };
}

sqlx_factory!(PostgresFactory, PostgresConnectionProvider, PostgresDialect);
sqlx_factory!(MySqlFactory, MySqlConnectionProvider, MySqlDialect);
sqlx_factory!(SqliteFactory, SqliteConnectionProvider, SqliteDialect);

/// Registers the `postgres`/`mysql`/`sqlite` sqlx-backed factories under
/// their `software` names in the process-wide [`crate::registry`]. Call once
/// at process startup, before any chain is executed through the registry
/// lookup path — [`crate::registry`]'s own discipline is "read-only after
/// init", and this is the init.
pub fn register_builtin_drivers() {
    registry::register("postgres", Arc::new(PostgresFactory));
    registry::register("mysql", Arc::new(MySqlFactory));
    registry::register("sqlite", Arc::new(SqliteFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_drivers_register_under_their_software_name() {
        register_builtin_drivers();
        assert_eq!(registry::dialect_for("postgres").unwrap().name(), "postgres");
        assert_eq!(registry::dialect_for("mysql").unwrap().name(), "mysql");
        assert_eq!(registry::dialect_for("sqlite").unwrap().name(), "sqlite");
        assert!(registry::provider_for("postgres").is_some());
    }
}
