//! Listener wiring and startup.
//!
//! Binds the gRPC server on all interfaces at the configured port,
//! registers the query and health services, and serves until the
//! process is terminated. There is no graceful-shutdown drain beyond
//! what the transport provides by default.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tonic::transport::Server;
use tracing::info;

use crate::config::Config;
use crate::health_pb::health_server::HealthServer;
use crate::pb::shakespeare_service_server::ShakespeareServiceServer;
use crate::service::{HealthService, QueryService};
use crate::store::ObjectStore;

/// Start serving and block until externally terminated.
///
/// Call handling is bounded by `server.handler_concurrency` (reference
/// size 4); calls beyond that queue until a slot frees. Within each
/// call the fetcher runs its own bounded download pool.
pub async fn run_server(config: Config, store: Arc<dyn ObjectStore>) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.server.port)
        .parse()
        .with_context(|| format!("invalid listen port: {}", config.server.port))?;

    let handler_concurrency = config.server.handler_concurrency;
    let config = Arc::new(config);
    let query_service = QueryService::new(store, Arc::clone(&config));

    info!("starting server: {}", addr);

    Server::builder()
        .concurrency_limit_per_connection(handler_concurrency)
        .add_service(ShakespeareServiceServer::new(query_service))
        .add_service(HealthServer::new(HealthService))
        .serve(addr)
        .await
        .context("gRPC server terminated with an error")?;

    Ok(())
}
