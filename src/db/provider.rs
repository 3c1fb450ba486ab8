//! Connection provider seam.
//!
//! Components never talk to the driver directly. They acquire a [`Session`] from a
//! [`ConnectionProvider`], wrapped in a [`SessionLease`] that guarantees the session
//! goes back to the pool on every exit path.

use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::io::Read;
use tracing::warn;

/// Column descriptor as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    /// Driver type name, e.g. "VARCHAR2(20)" or "NUMBER(6,0)"
    pub type_name: String,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Character or binary large object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobKind {
    Character,
    Binary,
}

/// Handle to out-of-line data that must be read before it leaves the data layer.
pub struct LobHandle {
    kind: LobKind,
    reader: Box<dyn Read + Send>,
}

impl LobHandle {
    pub fn new(kind: LobKind, reader: impl Read + Send + 'static) -> Self {
        Self {
            kind,
            reader: Box::new(reader),
        }
    }

    /// Handle over content the driver already fetched.
    pub fn from_bytes(kind: LobKind, bytes: Vec<u8>) -> Self {
        Self::new(kind, std::io::Cursor::new(bytes))
    }

    pub fn kind(&self) -> LobKind {
        self.kind
    }

    /// Read the object to completion.
    pub fn read_all(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for LobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobHandle")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A driver-native cell value.
#[derive(Debug)]
pub enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// Exact decimal text of an Oracle NUMBER
    Number(String),
    Text(String),
    /// DATE, TIMESTAMP, TIMESTAMP WITH LOCAL TIME ZONE
    DateTime(NaiveDateTime),
    /// TIMESTAMP WITH TIME ZONE
    DateTimeTz(DateTime<FixedOffset>),
    /// RAW, LONG RAW
    Bytes(Vec<u8>),
    Lob(LobHandle),
    /// Anything else, rendered by the driver
    Opaque { type_name: String, text: String },
}

/// Rows fetched for a statement that produced a column set.
#[derive(Debug, Default)]
pub struct RawRowSet {
    pub columns: Vec<RawColumn>,
    pub rows: Vec<Vec<RawValue>>,
}

/// What a statement produced.
#[derive(Debug)]
pub enum RawOutcome {
    Rows(RawRowSet),
    Completed { rows_affected: u64 },
}

impl RawOutcome {
    /// Expect a column set, as catalog and plan queries always produce one.
    pub fn into_rows(self) -> DbResult<RawRowSet> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Completed { .. } => Err(DbError::internal("statement returned no column set")),
        }
    }
}

/// One leased database session.
#[async_trait]
pub trait Session: Send {
    /// Run a statement with positional binds.
    async fn query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<RawOutcome>;

    async fn commit(&mut self) -> DbResult<()>;

    /// Return the session to its pool.
    async fn close(self: Box<Self>);
}

/// Hands out sessions from a pool.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self) -> DbResult<Box<dyn Session>>;

    /// Close the pool. Called once on shutdown.
    async fn shutdown(&self);

    /// Short backend name for logging.
    fn name(&self) -> &'static str;
}

/// Scoped session.
///
/// Call [`SessionLease::release`] when done. A lease that is dropped instead, for
/// example by a cancelled future, closes its session on a spawned task.
pub struct SessionLease {
    session: Option<Box<dyn Session>>,
}

impl SessionLease {
    /// Acquire a session from the provider.
    pub async fn acquire(provider: &dyn ConnectionProvider) -> DbResult<Self> {
        let session = provider.acquire().await?;
        Ok(Self {
            session: Some(session),
        })
    }

    fn session(&mut self) -> DbResult<&mut (dyn Session + 'static)> {
        self.session
            .as_deref_mut()
            .ok_or_else(|| DbError::internal("session already released"))
    }

    pub async fn query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<RawOutcome> {
        self.session()?.query(sql, params).await
    }

    pub async fn commit(&mut self) -> DbResult<()> {
        self.session()?.commit().await
    }

    /// Explicitly release the session (preferred over relying on Drop).
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    session.close().await;
                    warn!("Session released via Drop - consider using explicit release()");
                });
            }
            // No runtime left; dropping the session returns it to the pool synchronously.
            Err(_) => drop(session),
        }
    }
}
