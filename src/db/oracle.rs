//! Oracle session pool backed by the `oracle` crate.
//!
//! The driver is blocking, so every round trip runs on the blocking thread pool.
//! A session's connection is moved into the blocking task and handed back when
//! the task finishes.

use crate::config::{Config, ConnectionString};
use crate::db::provider::{
    ConnectionProvider, LobHandle, LobKind, RawColumn, RawOutcome, RawRowSet, RawValue, Session,
};
use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use oracle::pool::{CloseMode, Pool, PoolBuilder};
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, Row};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pool sizing and per-call settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_increment: u32,
    pub call_timeout: Option<Duration>,
}

impl PoolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_connections: config.pool_min,
            max_connections: config.pool_max,
            connection_increment: config.pool_increment,
            call_timeout: config.call_timeout_duration(),
        }
    }
}

/// Connection provider over an Oracle session pool.
pub struct OracleProvider {
    pool: Arc<Pool>,
    call_timeout: Option<Duration>,
}

impl OracleProvider {
    /// Create the session pool. Opens `min_connections` sessions eagerly.
    pub async fn connect(conn: &ConnectionString, settings: PoolSettings) -> DbResult<Self> {
        let conn = conn.clone();
        info!(
            user = %conn.username,
            connect = %conn.connect_descriptor,
            min = settings.min_connections,
            max = settings.max_connections,
            "Creating Oracle session pool"
        );

        let pool = tokio::task::spawn_blocking(move || {
            PoolBuilder::new(conn.username, conn.password, conn.connect_descriptor)
                .min_connections(settings.min_connections)
                .max_connections(settings.max_connections)
                .connection_increment(settings.connection_increment)
                .build()
        })
        .await??;

        Ok(Self {
            pool: Arc::new(pool),
            call_timeout: settings.call_timeout,
        })
    }
}

#[async_trait]
impl ConnectionProvider for OracleProvider {
    async fn acquire(&self) -> DbResult<Box<dyn Session>> {
        let pool = self.pool.clone();
        let call_timeout = self.call_timeout;
        let conn = tokio::task::spawn_blocking(move || -> DbResult<Connection> {
            let conn = pool.get()?;
            conn.set_call_timeout(call_timeout)?;
            Ok(conn)
        })
        .await??;
        Ok(Box::new(OracleSession { conn: Some(conn) }))
    }

    async fn shutdown(&self) {
        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || pool.close(&CloseMode::Default)).await;
        match result {
            Ok(Ok(())) => info!("Oracle session pool closed"),
            Ok(Err(e)) => warn!(error = %e, "Failed to close Oracle session pool"),
            Err(e) => warn!(error = %e, "Pool close task failed"),
        }
    }

    fn name(&self) -> &'static str {
        "oracle"
    }
}

/// One pooled Oracle connection.
struct OracleSession {
    /// `None` only while a blocking call holds the connection.
    conn: Option<Connection>,
}

impl OracleSession {
    /// Run `f` with the connection on the blocking pool.
    async fn with_conn<T, F>(&mut self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| DbError::internal("connection lost after a failed call"))?;
        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = f(&conn);
            (conn, result)
        })
        .await?;
        self.conn = Some(conn);
        result
    }
}

#[async_trait]
impl Session for OracleSession {
    async fn query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<RawOutcome> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| run_statement(conn, &sql, &params))
            .await
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.with_conn(|conn| Ok(conn.commit()?)).await
    }

    async fn close(self: Box<Self>) {
        let OracleSession { conn } = *self;
        let Some(conn) = conn else {
            return;
        };
        let result = tokio::task::spawn_blocking(move || conn.close()).await;
        match result {
            Ok(Ok(())) => debug!("Session returned to pool"),
            Ok(Err(e)) => warn!(error = %e, "Failed to return session to pool"),
            Err(e) => warn!(error = %e, "Session close task failed"),
        }
    }
}

fn bind_value(param: &QueryParam) -> Box<dyn ToSql> {
    match param {
        QueryParam::Null => Box::new(None::<String>),
        QueryParam::Bool(b) => Box::new(i64::from(*b)),
        QueryParam::Int(i) => Box::new(*i),
        QueryParam::Float(f) => Box::new(*f),
        QueryParam::String(s) => Box::new(s.clone()),
    }
}

fn run_statement(conn: &Connection, sql: &str, params: &[QueryParam]) -> DbResult<RawOutcome> {
    let binds: Vec<Box<dyn ToSql>> = params.iter().map(bind_value).collect();
    let bind_refs: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn.statement(sql).build()?;
    if !stmt.is_query() {
        stmt.execute(&bind_refs)?;
        let rows_affected = stmt.row_count()?;
        return Ok(RawOutcome::Completed { rows_affected });
    }

    let result_set = stmt.query(&bind_refs)?;
    let column_info = result_set.column_info();
    let columns: Vec<RawColumn> = column_info
        .iter()
        .map(|c| RawColumn::new(c.name(), c.oracle_type().to_string()))
        .collect();
    let types: Vec<OracleType> = column_info.iter().map(|c| c.oracle_type().clone()).collect();

    let mut rows = Vec::new();
    for row in result_set {
        let row = row?;
        let values = types
            .iter()
            .enumerate()
            .map(|(idx, ty)| read_value(&row, idx, ty))
            .collect::<DbResult<Vec<_>>>()?;
        rows.push(values);
    }

    Ok(RawOutcome::Rows(RawRowSet { columns, rows }))
}

/// Fetch one cell as the closest raw value.
fn read_value(row: &Row, idx: usize, ty: &OracleType) -> DbResult<RawValue> {
    fn opt<T>(value: Option<T>, f: impl FnOnce(T) -> RawValue) -> RawValue {
        value.map(f).unwrap_or(RawValue::Null)
    }

    let value = match ty {
        OracleType::Number(..) | OracleType::Float(..) => {
            opt(row.get::<_, Option<String>>(idx)?, RawValue::Number)
        }
        OracleType::BinaryFloat | OracleType::BinaryDouble => {
            opt(row.get::<_, Option<f64>>(idx)?, RawValue::Float)
        }
        OracleType::Boolean => opt(row.get::<_, Option<bool>>(idx)?, RawValue::Bool),
        OracleType::Date | OracleType::Timestamp(..) | OracleType::TimestampLTZ(..) => {
            opt(row.get::<_, Option<NaiveDateTime>>(idx)?, RawValue::DateTime)
        }
        OracleType::TimestampTZ(..) => opt(
            row.get::<_, Option<DateTime<FixedOffset>>>(idx)?,
            RawValue::DateTimeTz,
        ),
        OracleType::CLOB | OracleType::NCLOB => opt(row.get::<_, Option<String>>(idx)?, |s| {
            RawValue::Lob(LobHandle::from_bytes(LobKind::Character, s.into_bytes()))
        }),
        OracleType::BLOB => opt(row.get::<_, Option<Vec<u8>>>(idx)?, |b| {
            RawValue::Lob(LobHandle::from_bytes(LobKind::Binary, b))
        }),
        OracleType::Raw(..) | OracleType::LongRaw => {
            opt(row.get::<_, Option<Vec<u8>>>(idx)?, RawValue::Bytes)
        }
        OracleType::Varchar2(..)
        | OracleType::NVarchar2(..)
        | OracleType::Char(..)
        | OracleType::NChar(..)
        | OracleType::Long
        | OracleType::Rowid => opt(row.get::<_, Option<String>>(idx)?, RawValue::Text),
        other => {
            let type_name = other.to_string();
            opt(row.get::<_, Option<String>>(idx)?, |text| RawValue::Opaque {
                type_name,
                text,
            })
        }
    };
    Ok(value)
}
