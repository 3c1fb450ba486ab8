//! Error types for the Oracle MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each error variant carries a message that is surfaced verbatim to the MCP client,
//! plus an optional suggestion to help AI assistants recover.

use thiserror::Error;

/// Message returned whenever the statement guard rejects a statement.
pub const UNSAFE_STATEMENT_MESSAGE: &str =
    "Only SELECT, DESCRIBE, and EXPLAIN PLAN statements are allowed";

#[derive(Error, Debug)]
pub enum DbError {
    /// Startup configuration is missing or invalid. Never retried.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{message}")]
    UnsafeStatement {
        message: String,
        /// Leading keyword or deny-listed keyword that triggered the rejection
        keyword: Option<String>,
    },

    /// Driver or network failure, message kept as the driver reported it.
    #[error("{message}")]
    Backend {
        message: String,
        /// e.g., "ORA-00942" for table or view does not exist
        code: Option<String>,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create the standard rejection error for a statement the guard refuses.
    pub fn unsafe_statement(keyword: Option<String>) -> Self {
        Self::UnsafeStatement {
            message: UNSAFE_STATEMENT_MESSAGE.to_string(),
            keyword,
        }
    }

    /// Create a backend error, extracting the ORA code from the message when present.
    pub fn backend(message: impl Into<String>) -> Self {
        let message = message.into();
        let code = extract_ora_code(&message);
        Self::Backend { message, code }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnsafeStatement { .. } => {
                Some("Rewrite the request as a SELECT, WITH, DESCRIBE or EXPLAIN PLAN statement")
            }
            Self::Backend { code: Some(code), .. } => match code.as_str() {
                "ORA-00942" => Some("Check the table name and owner with list_tables"),
                "ORA-00904" => Some("Check the column names with describe_table"),
                "ORA-00933" | "ORA-00911" => Some("Check the SQL syntax"),
                "ORA-01017" => Some("Check the credentials in DB_CONNECTION_STRING"),
                _ => None,
            },
            Self::Configuration { .. } => Some("Set DB_CONNECTION_STRING to user/password@host:port/service"),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { code: Some(code), .. } => matches!(
                code.as_str(),
                // connection lost, TNS timeouts, call timeout
                "ORA-03113" | "ORA-03114" | "ORA-12170" | "ORA-12541" | "ORA-03156"
            ),
            _ => false,
        }
    }
}

/// Find the first `ORA-NNNNN` token in a driver message.
fn extract_ora_code(message: &str) -> Option<String> {
    let start = message.find("ORA-")?;
    let digits: String = message[start + 4..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("ORA-{digits}"))
    }
}

/// Convert Oracle driver errors to DbError.
impl From<oracle::Error> for DbError {
    fn from(err: oracle::Error) -> Self {
        DbError::backend(err.to_string())
    }
}

/// A blocking driver task panicked or was cancelled.
impl From<tokio::task::JoinError> for DbError {
    fn from(err: tokio::task::JoinError) -> Self {
        DbError::internal(format!("Database task failed: {}", err))
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::UnsafeStatement { .. } | DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }
            DbError::Backend { .. } | DbError::Configuration { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}
