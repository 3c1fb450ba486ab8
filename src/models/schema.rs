//! Schema-related data models.
//!
//! Catalog snapshots returned by the schema inspector. They are fetched fresh on
//! every call and never cached.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableMetadata {
    pub owner: String,
    pub table_name: String,
    /// Optimizer statistics estimate
    pub num_rows: Option<i64>,
    /// ISO-8601
    pub last_analyzed: Option<String>,
    pub table_comment: Option<String>,
    pub tablespace_name: Option<String>,
}

impl TableMetadata {
    /// Create table metadata with no statistics.
    pub fn new(owner: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            table_name: table_name.into(),
            num_rows: None,
            last_analyzed: None,
            table_comment: None,
            tablespace_name: None,
        }
    }

    /// Set the estimated row count.
    pub fn with_num_rows(mut self, num_rows: Option<i64>) -> Self {
        self.num_rows = num_rows;
        self
    }

    /// Set the statistics timestamp.
    pub fn with_last_analyzed(mut self, last_analyzed: Option<String>) -> Self {
        self.last_analyzed = last_analyzed;
        self
    }

    /// Set the table comment.
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.table_comment = comment;
        self
    }

    /// Set the tablespace.
    pub fn with_tablespace(mut self, tablespace_name: Option<String>) -> Self {
        self.tablespace_name = tablespace_name;
        self
    }

    /// `OWNER.TABLE` reference.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner, self.table_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewMetadata {
    pub owner: String,
    pub view_name: String,
    pub view_comment: Option<String>,
}

/// Stored program unit kinds listed by list_procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcedureKind {
    Procedure,
    Function,
    Package,
}

impl ProcedureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Procedure => "PROCEDURE",
            Self::Function => "FUNCTION",
            Self::Package => "PACKAGE",
        }
    }

    /// Parse an `all_objects.object_type` value.
    pub fn from_object_type(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PROCEDURE" => Some(Self::Procedure),
            "FUNCTION" => Some(Self::Function),
            "PACKAGE" => Some(Self::Package),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcedureMetadata {
    pub owner: String,
    pub object_name: String,
    pub object_type: ProcedureKind,
    /// VALID or INVALID
    pub status: Option<String>,
    pub created: Option<String>,
    pub last_ddl_time: Option<String>,
}

/// One column of a table, as reported by `all_tab_columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMetadata {
    pub column_name: String,
    /// Oracle type name, e.g. VARCHAR2, NUMBER, DATE, TIMESTAMP(6)
    pub data_type: String,
    pub data_length: Option<i64>,
    pub data_precision: Option<i64>,
    pub data_scale: Option<i64>,
    pub nullable: bool,
    pub data_default: Option<String>,
    pub column_comment: Option<String>,
    pub column_id: i64,
}

impl ColumnMetadata {
    /// Create column metadata with only name, type and position set.
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>, column_id: i64) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            data_length: None,
            data_precision: None,
            data_scale: None,
            nullable: true,
            data_default: None,
            column_comment: None,
            column_id,
        }
    }
}
