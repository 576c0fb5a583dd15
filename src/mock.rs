//! An in-memory [`Connection`] and [`ChainObserver`], used by this crate's
//! own tests (and available to downstream consumers) to exercise the chain
//! executor's control flow without a real database.

use crate::connection::{Connection, ConnectionCredentials, ConnectionProvider, ExecuteOutcome, LastId};
use crate::dialect::{Dialect, GenericDialect};
use crate::error::ConnectionError;
use crate::observer::ChainObserver;
use crate::statement::RowMap;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted response to an `execute_raw` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Rows(Vec<RowMap>),
    RowsWithId(Vec<RowMap>, LastId),
    /// `executeRaw` returns `null` — the spec's soft "statement failed" case.
    Fail,
}

/// A [`Connection`] whose `execute_raw` responses are scripted in advance,
/// consumed FIFO, one per call. Statements beyond the scripted queue get an
/// empty, id-less result rather than panicking, so chains with extra
/// incidental statements (e.g. the variable-binding pass) don't need every
/// call accounted for.
#[derive(Default)]
pub struct MockConnection {
    pub responses: VecDeque<MockResponse>,
    pub executed_sql: Vec<String>,
    pub began: bool,
    pub committed: bool,
    pub rolled_back: bool,
    pub fail_begin: bool,
    pub fail_commit: bool,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&mut self, rows: Vec<RowMap>) {
        self.responses.push_back(MockResponse::Rows(rows));
    }

    pub fn push_rows_with_id(&mut self, rows: Vec<RowMap>, id: LastId) {
        self.responses.push_back(MockResponse::RowsWithId(rows, id));
    }

    pub fn push_failure(&mut self) {
        self.responses.push_back(MockResponse::Fail);
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn begin(&mut self) -> Result<bool, ConnectionError> {
        if self.fail_begin {
            return Ok(false);
        }
        self.began = true;
        Ok(true)
    }

    async fn commit(&mut self) -> Result<bool, ConnectionError> {
        if self.fail_commit {
            return Ok(false);
        }
        self.committed = true;
        Ok(true)
    }

    async fn rollback(&mut self) -> Result<bool, ConnectionError> {
        self.rolled_back = true;
        Ok(true)
    }

    async fn execute_raw(&mut self, sql: &str) -> Result<Option<ExecuteOutcome>, ConnectionError> {
        self.executed_sql.push(sql.to_string());
        match self.responses.pop_front() {
            Some(MockResponse::Rows(rows)) => Ok(Some(ExecuteOutcome {
                results: rows,
                last_id: None,
            })),
            Some(MockResponse::RowsWithId(rows, id)) => Ok(Some(ExecuteOutcome {
                results: rows,
                last_id: Some(id),
            })),
            Some(MockResponse::Fail) => Ok(None),
            None => Ok(Some(ExecuteOutcome::default())),
        }
    }

    fn dialect(&self) -> &dyn Dialect {
        &GenericDialect
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }
}

/// A `ConnectionProvider` that always hands out a fresh, empty `MockConnection`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockProvider;

#[async_trait]
impl ConnectionProvider for MockProvider {
    async fn connect(&self, _creds: &ConnectionCredentials) -> Result<Box<dyn Connection>, ConnectionError> {
        Ok(Box::new(MockConnection::new()))
    }
}

/// A [`ChainObserver`] that records every `on_info`/`on_error` call in
/// order, so tests can assert on the exact log sequence the spec's
/// chain-level scenario (§8) requires.
#[derive(Default)]
pub struct RecordingObserver {
    info: Mutex<Vec<String>>,
    error: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self) -> Vec<String> {
        self.info.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.error.lock().unwrap().clone()
    }
}

impl ChainObserver for RecordingObserver {
    fn on_info(&self, message: &str) {
        self.info.lock().unwrap().push(message.to_string());
    }

    fn on_error(&self, message: &str) {
        self.error.lock().unwrap().push(message.to_string());
    }
}
