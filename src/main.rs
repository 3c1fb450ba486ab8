//! Oracle MCP Server - Main entry point.

use clap::Parser;
use oracle_mcp_server::config::{Config, TransportMode};
use oracle_mcp_server::db::{ConnectionProvider, OracleProvider, PoolSettings};
use oracle_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.effective_log_level()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    let connection = match config.connection() {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Usage: oracle-mcp-server --connection-string <user/password@host:port/service>");
            eprintln!("       DB_CONNECTION_STRING=<user/password@host:port/service> oracle-mcp-server");
            eprintln!();
            eprintln!("Examples:");
            eprintln!("  oracle-mcp-server --connection-string scott/tiger@localhost:1521/XEPDB1");
            eprintln!("  DB_CONNECTION_STRING=hr/secret@//db.example.com/ORCL oracle-mcp-server -t http");
            std::process::exit(1);
        }
    };
    let policy = Arc::new(config.policy()?);
    config.validate_pool()?;

    info!(
        transport = %config.transport,
        row_limit = policy.row_limit,
        max_export_rows = policy.max_export_rows,
        allow_listed_tables = policy.table_allow_list.len(),
        "Starting Oracle MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let provider: Arc<dyn ConnectionProvider> = Arc::new(
        OracleProvider::connect(&connection, PoolSettings::from_config(&config)).await?,
    );

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(provider, policy).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                provider,
                policy,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
