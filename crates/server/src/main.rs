//! menucache-sw entry point.
//!
//! Boots the offline cache proxy and exposes its lifecycle signals as MCP
//! tools on stdio transport. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use menucache_client::{FetchConfig, HttpFetcher, OfflineProxy};
use menucache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db = %config.db_path.display(),
        origin = %config.manifest.origin,
        "starting menucache-sw on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(&FetchConfig::from_app_config(&config))?;
    let proxy = Arc::new(OfflineProxy::new(&config, db, Arc::new(fetcher))?);

    let handler = handler::ProxyServer::new(Arc::clone(&proxy));
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    proxy.settle().await;
    tracing::info!("menucache-sw stopped");

    Ok(())
}
