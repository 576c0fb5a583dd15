//! A small bounded connection pool (spec §5), the same "bounded pool plus
//! retrying connect" shape as `deadpool_postgres::Pool` (which
//! `PostgresCatalogManager` builds directly), hand-rolled here because
//! `Connection` is this crate's own trait rather than `tokio_postgres::Client`.

use crate::connection::{Connection, ConnectionCredentials, ConnectionProvider};
use crate::error::ConnectionError;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;

/// Pool sizing and retry policy (spec §5 / §9 `[EXPANSION]`).
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: usize,
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        PoolSettings {
            max_connections: 8,
            max_retries: 3,
            retry_interval: Duration::from_millis(200),
        }
    }
}

struct Inner {
    idle: Mutex<VecDeque<Box<dyn Connection>>>,
    notify: Notify,
    outstanding: Mutex<usize>,
}

/// A bounded pool of `Connection`s for one set of credentials, built from a
/// `ConnectionProvider`. `acquire`/`release` are explicit rather than an
/// RAII guard — Rust has no stable async `Drop`, so there's no way to return
/// a connection to the pool automatically when a guard goes out of scope.
pub struct ConnectionPool {
    provider: std::sync::Arc<dyn ConnectionProvider>,
    credentials: ConnectionCredentials,
    settings: PoolSettings,
    inner: Inner,
}

impl ConnectionPool {
    pub fn new(
        provider: std::sync::Arc<dyn ConnectionProvider>,
        credentials: ConnectionCredentials,
        settings: PoolSettings,
    ) -> Self {
        ConnectionPool {
            provider,
            credentials,
            settings,
            inner: Inner {
                idle: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                outstanding: Mutex::new(0),
            },
        }
    }

    /// Hands back an idle connection if one is available; otherwise opens a
    /// new one (retrying per `PoolSettings`) if under `max_connections`, or
    /// waits for a release if at capacity.
    pub async fn acquire(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        loop {
            if let Some(conn) = self.inner.idle.lock().await.pop_front() {
                return Ok(conn);
            }

            let mut outstanding = self.inner.outstanding.lock().await;
            if *outstanding < self.settings.max_connections {
                *outstanding += 1;
                drop(outstanding);
                return self.connect_with_retry().await;
            }
            drop(outstanding);

            self.inner.notify.notified().await;
        }
    }

    /// Returns `conn` to the idle queue and wakes one waiting `acquire`.
    pub async fn release(&self, conn: Box<dyn Connection>) {
        self.inner.idle.lock().await.push_back(conn);
        self.inner.notify.notify_one();
    }

    /// Drops `conn` instead of returning it (e.g. after a connection-level
    /// error), freeing its capacity slot for a fresh connect.
    pub async fn discard(&self, mut conn: Box<dyn Connection>) {
        let _ = conn.close().await;
        *self.inner.outstanding.lock().await -= 1;
        self.inner.notify.notify_one();
    }

    async fn connect_with_retry(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        let mut attempt = 0;
        loop {
            match self.provider.connect(&self.credentials).await {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.settings.max_retries {
                        *self.inner.outstanding.lock().await -= 1;
                        self.inner.notify.notify_one();
                        return Err(err);
                    }
                    sleep(self.settings.retry_interval).await;
                }
            }
        }
    }
}
