//! Statement guard for read-only query tools.
//!
//! Classifies a statement by its leading keyword and a deny-list scan, then caps
//! SELECT-shaped statements with a `ROWNUM` predicate. This is a keyword heuristic,
//! not a parser: keywords inside string literals or comments still count, and an
//! allow-listed statement is never scanned for deny-listed keywords.

use crate::error::{DbError, DbResult};
use tracing::debug;

/// Leading keywords that are always accepted.
pub const ALLOWED_PREFIXES: &[&str] = &["SELECT", "WITH", "DESCRIBE", "DESC", "EXPLAIN"];

/// Keywords that reject an unlisted statement wherever they appear.
pub const DENIED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "TRUNCATE", "ALTER", "CREATE", "INSERT", "UPDATE",
];

/// Markers of a row limit the caller already wrote.
pub const ROW_LIMIT_MARKERS: &[&str] = &["ROWNUM", "LIMIT", "FETCH FIRST", "FETCH NEXT"];

/// How a statement passed the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementClass {
    /// Leading keyword is on the allow-list
    AllowListed(&'static str),
    /// Not allow-listed, but no deny-listed keyword appears
    Unlisted,
}

/// Applied row cap, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimitRewrite {
    /// `SELECT * FROM (<sql>) WHERE ROWNUM <= n`
    Wrapped,
    /// `<sql> AND ROWNUM <= n`
    AndPredicate,
    /// `<sql> WHERE ROWNUM <= n`
    WherePredicate,
    /// Statement has no SELECT or already limits its rows
    Unchanged,
}

/// Statement guard. Stateless; the row limit is passed per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGuard;

impl StatementGuard {
    pub fn new() -> Self {
        Self
    }

    /// Classify `sql` and return the statement to execute.
    pub fn classify_and_rewrite(&self, sql: &str, row_limit: u32) -> DbResult<String> {
        let statement = strip_terminator(sql);
        self.classify(statement)?;
        let (rewritten, kind) = self.rewrite(statement, row_limit);
        debug!(rewrite = ?kind, sql = %rewritten, "Statement accepted");
        Ok(rewritten)
    }

    /// Accept or reject a statement.
    pub fn classify(&self, sql: &str) -> DbResult<StatementClass> {
        let upper = comparison_form(sql);
        if upper.is_empty() {
            return Err(DbError::invalid_input("SQL statement is empty"));
        }

        if let Some(prefix) = ALLOWED_PREFIXES.iter().find(|p| upper.starts_with(*p)) {
            return Ok(StatementClass::AllowListed(*prefix));
        }

        match DENIED_KEYWORDS.iter().find(|k| upper.contains(*k)) {
            Some(keyword) => Err(DbError::unsafe_statement(Some(keyword.to_string()))),
            None => Ok(StatementClass::Unlisted),
        }
    }

    /// Append a `ROWNUM` cap to SELECT-shaped statements.
    ///
    /// The original casing of `sql` is kept; keyword detection uses an uppercased,
    /// whitespace-collapsed copy.
    pub fn rewrite(&self, sql: &str, row_limit: u32) -> (String, RowLimitRewrite) {
        let upper = comparison_form(sql);

        if !upper.contains("SELECT") || ROW_LIMIT_MARKERS.iter().any(|m| upper.contains(m)) {
            return (sql.to_string(), RowLimitRewrite::Unchanged);
        }

        if upper.contains("ORDER BY") {
            // A filter after ORDER BY would apply before the sort.
            (
                format!("SELECT * FROM ({sql}) WHERE ROWNUM <= {row_limit}"),
                RowLimitRewrite::Wrapped,
            )
        } else if upper.contains("WHERE") {
            (
                format!("{sql} AND ROWNUM <= {row_limit}"),
                RowLimitRewrite::AndPredicate,
            )
        } else {
            (
                format!("{sql} WHERE ROWNUM <= {row_limit}"),
                RowLimitRewrite::WherePredicate,
            )
        }
    }
}

/// Trim whitespace and trailing semicolons; Oracle rejects a terminator in OCI calls.
pub fn strip_terminator(sql: &str) -> &str {
    let mut s = sql.trim();
    while let Some(rest) = s.strip_suffix(';') {
        s = rest.trim_end();
    }
    s
}

fn comparison_form(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
