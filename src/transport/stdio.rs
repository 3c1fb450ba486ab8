//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.
//! Logs go to stderr so stdout carries only protocol messages.

use crate::config::QueryPolicy;
use crate::db::ConnectionProvider;
use crate::error::{DbError, DbResult};
use crate::mcp::OracleService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
pub struct StdioTransport {
    provider: Arc<dyn ConnectionProvider>,
    policy: Arc<QueryPolicy>,
}

impl StdioTransport {
    pub fn new(provider: Arc<dyn ConnectionProvider>, policy: Arc<QueryPolicy>) -> Self {
        Self { provider, policy }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!(backend = self.provider.name(), "Starting MCP server with stdio transport");

        let service = OracleService::new(self.provider.clone(), self.policy.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {e}")))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    self.provider.shutdown().await;
                    return Err(DbError::internal(format!("Stdio transport error: {e}")));
                }
                info!("Stdio transport completed normally");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing Oracle session pool");
        self.provider.shutdown().await;

        if shutdown_requested {
            // A blocking stdin read cannot be cancelled from select!
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
