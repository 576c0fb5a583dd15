//! The driver registry (spec §9 concurrency note): a process-wide map from
//! a chain's `software` string to the factory that builds its
//! `ConnectionProvider`, populated once at startup and read-only after.
//!
//! Mirrors the "read-only after init" discipline the teacher applies to its
//! own registered `DataFetcher` implementations, but keyed by name instead
//! of dispatched through an enum.

use crate::connection::ConnectionProvider;
use crate::dialect::Dialect;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Builds the `ConnectionProvider` and `Dialect` pair for one `software` key.
pub trait ConnectionProviderFactory: Send + Sync {
    fn provider(&self) -> Arc<dyn ConnectionProvider>;
    fn dialect(&self) -> Arc<dyn Dialect>;
}

static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<dyn ConnectionProviderFactory>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, Arc<dyn ConnectionProviderFactory>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `factory` under `software`, replacing whatever was registered
/// before. Call during process startup, before any chain executes.
pub fn register(software: impl Into<String>, factory: Arc<dyn ConnectionProviderFactory>) {
    registry()
        .write()
        .expect("driver registry lock poisoned")
        .insert(software.into(), factory);
}

/// The factory registered for `software`, if any.
pub fn factory_for(software: &str) -> Option<Arc<dyn ConnectionProviderFactory>> {
    registry().read().expect("driver registry lock poisoned").get(software).cloned()
}

/// The `ConnectionProvider` registered for `software`, if any.
pub fn provider_for(software: &str) -> Option<Arc<dyn ConnectionProvider>> {
    factory_for(software).map(|f| f.provider())
}

/// The `Dialect` registered for `software`, if any.
pub fn dialect_for(software: &str) -> Option<Arc<dyn Dialect>> {
    factory_for(software).map(|f| f.dialect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ConnectionCredentials, ExecuteOutcome};
    use crate::dialect::GenericDialect;
    use crate::error::ConnectionError;
    use async_trait::async_trait;

    struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn begin(&mut self) -> Result<bool, ConnectionError> {
            Ok(true)
        }
        async fn commit(&mut self) -> Result<bool, ConnectionError> {
            Ok(true)
        }
        async fn rollback(&mut self) -> Result<bool, ConnectionError> {
            Ok(true)
        }
        async fn execute_raw(&mut self, _sql: &str) -> Result<Option<ExecuteOutcome>, ConnectionError> {
            Ok(Some(ExecuteOutcome::default()))
        }
        fn dialect(&self) -> &dyn Dialect {
            &GenericDialect
        }
        async fn close(&mut self) -> Result<(), ConnectionError> {
            Ok(())
        }
    }

    struct NullProvider;

    #[async_trait]
    impl ConnectionProvider for NullProvider {
        async fn connect(&self, _creds: &ConnectionCredentials) -> Result<Box<dyn Connection>, ConnectionError> {
            Ok(Box::new(NullConnection))
        }
    }

    struct NullFactory;

    impl ConnectionProviderFactory for NullFactory {
        fn provider(&self) -> Arc<dyn ConnectionProvider> {
            Arc::new(NullProvider)
        }
        fn dialect(&self) -> Arc<dyn Dialect> {
            Arc::new(GenericDialect)
        }
    }

    #[test]
    fn unregistered_software_yields_none() {
        assert!(factory_for("nonexistent-test-driver-xyz").is_none());
    }

    #[test]
    fn register_then_lookup_round_trips() {
        register("test-driver-registry-roundtrip", Arc::new(NullFactory));
        assert!(provider_for("test-driver-registry-roundtrip").is_some());
        assert_eq!(
            dialect_for("test-driver-registry-roundtrip").unwrap().name(),
            "generic"
        );
    }
}
