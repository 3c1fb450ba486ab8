//! Oracle MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to explore Oracle databases: guarded read-only queries, data dictionary
//! introspection, execution plans, sample queries and result export.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::{Config, QueryPolicy};
pub use error::DbError;
pub use mcp::OracleService;
