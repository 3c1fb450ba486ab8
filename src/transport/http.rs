//! HTTP transport with Streamable HTTP support for the MCP server.

use crate::config::QueryPolicy;
use crate::db::ConnectionProvider;
use crate::error::{DbError, DbResult};
use crate::mcp::OracleService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Time allowed for open streams to finish after a shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport implementation.
///
/// Every MCP session gets its own `OracleService`; all of them share one
/// provider and therefore one session pool.
pub struct HttpTransport {
    provider: Arc<dyn ConnectionProvider>,
    policy: Arc<QueryPolicy>,
    host: String,
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        provider: Arc<dyn ConnectionProvider>,
        policy: Arc<QueryPolicy>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            policy,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> axum::Router {
        let provider = self.provider.clone();
        let policy = self.policy.clone();
        let service = StreamableHttpService::new(
            move || Ok(OracleService::new(provider.clone(), policy.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/"
        if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting MCP server with HTTP transport on {}", bind_addr);

        let app = self.router();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::configuration(format!("Failed to bind to {bind_addr}: {e}"))
        })?;
        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let notify = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            notify.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Open SSE streams can hold graceful shutdown forever
        let mut outcome = Ok(());
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        outcome = Err(DbError::internal(format!("HTTP server error: {e}")));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing Oracle session pool");
        self.provider.shutdown().await;
        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
