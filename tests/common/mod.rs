//! Scripted connection provider shared by the integration tests.
//!
//! Replies are matched by SQL substring in registration order; the first match
//! wins. Every statement, bind list, acquire, release and commit is recorded.

#![allow(dead_code)]

use async_trait::async_trait;
use oracle_mcp_server::db::provider::{
    LobHandle, LobKind, RawColumn, RawOutcome, RawRowSet, RawValue,
};
use oracle_mcp_server::db::{ConnectionProvider, Session};
use oracle_mcp_server::error::{DbError, DbResult};
use oracle_mcp_server::models::QueryParam;
use std::io::Read;
use std::sync::{Arc, Mutex};

/// A cell that can be turned into a fresh `RawValue` on every call.
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Text(String),
    Int(i64),
    Number(String),
    Clob(String),
    BrokenLob,
}

impl Cell {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    fn to_raw(&self) -> RawValue {
        match self {
            Self::Null => RawValue::Null,
            Self::Text(s) => RawValue::Text(s.clone()),
            Self::Int(i) => RawValue::Integer(*i),
            Self::Number(n) => RawValue::Number(n.clone()),
            Self::Clob(s) => {
                RawValue::Lob(LobHandle::from_bytes(LobKind::Character, s.clone().into_bytes()))
            }
            Self::BrokenLob => RawValue::Lob(LobHandle::new(LobKind::Character, BrokenReader)),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("ORA-22922: nonexistent LOB value"))
    }
}

type Responder = Arc<dyn Fn(&[QueryParam]) -> Reply + Send + Sync>;

/// Scripted result of one statement.
#[derive(Clone)]
pub enum Reply {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    },
    Completed,
    Fail(String),
    /// Computed from the bind values
    Dynamic(Responder),
}

impl Reply {
    pub fn rows(columns: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        Self::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_string())
    }

    pub fn dynamic(f: impl Fn(&[QueryParam]) -> Reply + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    fn outcome(&self, params: &[QueryParam]) -> DbResult<RawOutcome> {
        match self {
            Self::Rows { columns, rows } => Ok(RawOutcome::Rows(RawRowSet {
                columns: columns
                    .iter()
                    .map(|c| RawColumn::new(c.as_str(), "VARCHAR2"))
                    .collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(Cell::to_raw).collect())
                    .collect(),
            })),
            Self::Completed => Ok(RawOutcome::Completed { rows_affected: 0 }),
            Self::Fail(message) => Err(DbError::backend(message.clone())),
            Self::Dynamic(f) => f(params).outcome(params),
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub executed: Vec<(String, Vec<QueryParam>)>,
    pub acquired: usize,
    pub released: usize,
    pub commits: usize,
}

/// Test double for the Oracle pool.
#[derive(Clone, Default)]
pub struct FakeProvider {
    replies: Arc<Mutex<Vec<(String, Reply)>>>,
    recorded: Arc<Mutex<Recorded>>,
    forbid_acquire: bool,
    fail_commit: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that fails the test if a session is ever requested.
    pub fn unreachable() -> Self {
        Self {
            forbid_acquire: true,
            ..Self::default()
        }
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Answer statements containing `pattern` with `reply`.
    pub fn on(self, pattern: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push((pattern.to_string(), reply));
        self
    }

    pub fn shared(&self) -> Arc<dyn ConnectionProvider> {
        Arc::new(self.clone())
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .executed
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn executed(&self) -> Vec<(String, Vec<QueryParam>)> {
        self.recorded.lock().unwrap().executed.clone()
    }

    pub fn acquired(&self) -> usize {
        self.recorded.lock().unwrap().acquired
    }

    pub fn released(&self) -> usize {
        self.recorded.lock().unwrap().released
    }

    pub fn commits(&self) -> usize {
        self.recorded.lock().unwrap().commits
    }
}

#[async_trait]
impl ConnectionProvider for FakeProvider {
    async fn acquire(&self) -> DbResult<Box<dyn Session>> {
        assert!(!self.forbid_acquire, "a session was acquired");
        self.recorded.lock().unwrap().acquired += 1;
        Ok(Box::new(FakeSession {
            provider: self.clone(),
        }))
    }

    async fn shutdown(&self) {}

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeSession {
    provider: FakeProvider,
}

#[async_trait]
impl Session for FakeSession {
    async fn query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<RawOutcome> {
        self.provider
            .recorded
            .lock()
            .unwrap()
            .executed
            .push((sql.to_string(), params.to_vec()));
        let reply = self
            .provider
            .replies
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Completed);
        reply.outcome(params)
    }

    async fn commit(&mut self) -> DbResult<()> {
        if self.provider.fail_commit {
            return Err(DbError::backend("ORA-03113: end-of-file on communication channel"));
        }
        self.provider.recorded.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.provider.recorded.lock().unwrap().released += 1;
    }
}
