//! Configuration handling for the Oracle MCP Server.
//!
//! Options come from CLI arguments or environment variables and are parsed once at
//! startup. Business logic never reads the environment; it receives a [`QueryPolicy`]
//! built by [`Config::policy`].

use crate::error::{DbError, DbResult};
use clap::{ArgAction, Parser, ValueEnum};
use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_LIMIT: u32 = 100;
pub const DEFAULT_MAX_EXPORT_ROWS: u32 = 10000;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

// Session pool defaults
pub const DEFAULT_POOL_MIN: u32 = 1;
pub const DEFAULT_POOL_MAX: u32 = 10;
pub const DEFAULT_POOL_INCREMENT: u32 = 1;

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// HTTP with Server-Sent Events (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Credentials and connect descriptor split out of `user/password@descriptor`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub username: String,
    pub password: String,
    /// Easy Connect string or TNS alias, e.g. `db-host:1521/ORCLPDB1`
    pub connect_descriptor: String,
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("username", &self.username)
            .field("password", &"***")
            .field("connect_descriptor", &self.connect_descriptor)
            .finish()
    }
}

impl ConnectionString {
    /// Parse `user/password@descriptor`.
    ///
    /// The password may itself contain `@`; the descriptor starts after the last one.
    pub fn parse(s: &str) -> DbResult<Self> {
        let s = s.trim();
        let (credentials, descriptor) = s.rsplit_once('@').ok_or_else(|| {
            DbError::configuration("connection string must look like user/password@host:port/service")
        })?;
        let (username, password) = credentials.split_once('/').ok_or_else(|| {
            DbError::configuration("connection string is missing the '/' between user and password")
        })?;

        if username.is_empty() || descriptor.is_empty() {
            return Err(DbError::configuration(
                "connection string must name a user and a connect descriptor",
            ));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            connect_descriptor: descriptor.to_string(),
        })
    }
}

/// Limits and allow-lists applied to every query and catalog lookup.
///
/// Built once from [`Config`] and shared read-only by all components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Row cap appended to SELECT statements by the guard
    pub row_limit: u32,
    /// Row cap used by export_query_results
    pub max_export_rows: u32,
    /// Uppercased table names; empty means no restriction
    pub table_allow_list: Vec<String>,
    /// Uppercased `TABLE.COLUMN` keys; empty means no restriction
    pub column_allow_list: HashSet<String>,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_QUERY_LIMIT,
            max_export_rows: DEFAULT_MAX_EXPORT_ROWS,
            table_allow_list: Vec::new(),
            column_allow_list: HashSet::new(),
        }
    }
}

impl QueryPolicy {
    /// Build a policy from raw values, normalizing allow-list entries.
    pub fn new(
        row_limit: u32,
        max_export_rows: u32,
        tables: &[String],
        columns: &[String],
    ) -> DbResult<Self> {
        if row_limit == 0 {
            return Err(DbError::configuration("QUERY_LIMIT_SIZE must be greater than 0"));
        }
        if max_export_rows == 0 {
            return Err(DbError::configuration("MAX_ROWS_EXPORT must be greater than 0"));
        }

        let mut table_allow_list: Vec<String> = Vec::new();
        for name in normalize_entries(tables) {
            if !table_allow_list.contains(&name) {
                table_allow_list.push(name);
            }
        }

        let column_allow_list = normalize_entries(columns).collect::<HashSet<_>>();
        if let Some(bad) = column_allow_list.iter().find(|key| !key.contains('.')) {
            return Err(DbError::configuration(format!(
                "COLUMN_WHITE_LIST entry '{bad}' must be TABLE.COLUMN"
            )));
        }

        Ok(Self {
            row_limit,
            max_export_rows,
            table_allow_list,
            column_allow_list,
        })
    }

    /// Whether a column of the given table may be shown.
    pub fn column_allowed(&self, table_name: &str, column_name: &str) -> bool {
        if self.column_allow_list.is_empty() {
            return true;
        }
        let key = format!(
            "{}.{}",
            table_name.to_uppercase(),
            column_name.to_uppercase()
        );
        self.column_allow_list.contains(&key)
    }
}

fn normalize_entries(entries: &[String]) -> impl Iterator<Item = String> + '_ {
    entries
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_uppercase)
}

/// On/off switches read from the environment: only "true" (any case) is on.
///
/// Anything else, such as `DEBUG=1` left behind by another tool, is off.
fn parse_switch(value: &str) -> Result<bool, Infallible> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

/// Configuration for the Oracle MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "oracle-mcp-server",
    about = "MCP server for Oracle databases - read-only queries, schema introspection and execution plans",
    version,
    author
)]
pub struct Config {
    /// Oracle connection string: user/password@host:port/service
    #[arg(long, value_name = "CONNECT", env = "DB_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Rows returned by execute_query before the ROWNUM cap applies
    #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT, env = "QUERY_LIMIT_SIZE")]
    pub query_limit: u32,

    /// Rows returned by export_query_results
    #[arg(long, default_value_t = DEFAULT_MAX_EXPORT_ROWS, env = "MAX_ROWS_EXPORT")]
    pub max_export_rows: u32,

    /// Tables visible to list_tables (comma-separated, empty = all)
    #[arg(long, value_name = "TABLE", env = "TABLE_WHITE_LIST", value_delimiter = ',')]
    pub table_white_list: Vec<String>,

    /// Columns visible to describe_table as TABLE.COLUMN (comma-separated, empty = all)
    #[arg(long, value_name = "TABLE.COLUMN", env = "COLUMN_WHITE_LIST", value_delimiter = ',')]
    pub column_white_list: Vec<String>,

    /// Enable debug logging
    #[arg(long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = parse_switch)]
    pub debug: bool,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "MCP_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "MCP_HTTP_PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Sessions opened when the pool starts
    #[arg(long, default_value_t = DEFAULT_POOL_MIN, env = "MCP_POOL_MIN")]
    pub pool_min: u32,

    /// Upper bound on pooled sessions
    #[arg(long, default_value_t = DEFAULT_POOL_MAX, env = "MCP_POOL_MAX")]
    pub pool_max: u32,

    /// Sessions opened at once when the pool grows
    #[arg(long, default_value_t = DEFAULT_POOL_INCREMENT, env = "MCP_POOL_INCREMENT")]
    pub pool_increment: u32,

    /// Per round-trip timeout in seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_CALL_TIMEOUT_SECS, env = "MCP_CALL_TIMEOUT")]
    pub call_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS", action = ArgAction::SetTrue, value_parser = parse_switch)]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            connection_string: None,
            query_limit: DEFAULT_QUERY_LIMIT,
            max_export_rows: DEFAULT_MAX_EXPORT_ROWS,
            table_white_list: Vec::new(),
            column_white_list: Vec::new(),
            debug: false,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            pool_min: DEFAULT_POOL_MIN,
            pool_max: DEFAULT_POOL_MAX,
            pool_increment: DEFAULT_POOL_INCREMENT,
            call_timeout: DEFAULT_CALL_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Parse the required connection string.
    pub fn connection(&self) -> DbResult<ConnectionString> {
        match self.connection_string.as_deref() {
            Some(s) if !s.trim().is_empty() => ConnectionString::parse(s),
            _ => Err(DbError::configuration(
                "DB_CONNECTION_STRING environment variable is required",
            )),
        }
    }

    /// Build the immutable query policy.
    pub fn policy(&self) -> DbResult<QueryPolicy> {
        QueryPolicy::new(
            self.query_limit,
            self.max_export_rows,
            &self.table_white_list,
            &self.column_white_list,
        )
    }

    /// Validate pool sizing.
    pub fn validate_pool(&self) -> DbResult<()> {
        if self.pool_max == 0 {
            return Err(DbError::configuration("pool_max must be greater than 0"));
        }
        if self.pool_min > self.pool_max {
            return Err(DbError::configuration(format!(
                "pool_min ({}) cannot exceed pool_max ({})",
                self.pool_min, self.pool_max
            )));
        }
        Ok(())
    }

    /// Effective log filter; `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug { "debug" } else { &self.log_level }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the call timeout as a Duration, `None` when disabled.
    pub fn call_timeout_duration(&self) -> Option<Duration> {
        (self.call_timeout > 0).then(|| Duration::from_secs(self.call_timeout))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
