//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection provider seam and scoped session leases
//! - Oracle session pool
//! - Guarded query execution and execution plans
//! - Schema introspection
//! - Result normalization

pub mod executor;
pub mod explain;
pub mod normalize;
pub mod oracle;
pub mod provider;
pub mod schema;

pub use executor::QueryExecutor;
pub use explain::ExplainPlanBuilder;
pub use normalize::ResultNormalizer;
pub use oracle::{OracleProvider, PoolSettings};
pub use provider::{ConnectionProvider, Session, SessionLease};
pub use schema::SchemaInspector;
