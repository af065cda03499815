//! gRPC service implementations.
//!
//! Two independent services share one listener:
//!
//! - [`QueryService`] implements `ShakespeareService.GetMatchCount`,
//!   orchestrating fetch → count for each call.
//! - [`HealthService`] implements the `grpc.health.v1` contract.
//!
//! Every call performs its own fetch and count with no shared mutable
//! state, so concurrent identical calls produce independent, identical
//! results. Internal failures — storage, decode, malformed pattern —
//! all surface to the caller as one opaque `internal` status; there is
//! no fine-grained error code mapping and no partial result.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use crate::config::Config;
use crate::fetch::fetch_corpus;
use crate::health_pb::health_server::Health;
use crate::health_pb::{health_check_response::ServingStatus, HealthCheckRequest, HealthCheckResponse};
use crate::matcher::{compile_query, count_matches};
use crate::observe;
use crate::pb::shakespeare_service_server::ShakespeareService;
use crate::pb::{ShakespeareRequest, ShakespeareResponse};
use crate::store::ObjectStore;

/// Map any internal failure onto the opaque status callers see.
fn internal(err: impl std::fmt::Display) -> Status {
    Status::internal(err.to_string())
}

/// The query-facing service. Holds only process-wide, immutable
/// collaborators; all per-request state lives on the stack of each call.
pub struct QueryService {
    store: Arc<dyn ObjectStore>,
    config: Arc<Config>,
}

impl QueryService {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }
}

#[tonic::async_trait]
impl ShakespeareService for QueryService {
    async fn get_match_count(
        &self,
        request: Request<ShakespeareRequest>,
    ) -> Result<Response<ShakespeareResponse>, Status> {
        let query = request.into_inner().query;
        info!("query: {}", query);

        let documents = fetch_corpus(
            Arc::clone(&self.store),
            &self.config.storage.prefix,
            self.config.storage.download_concurrency,
        )
        .await
        .map_err(internal)?;

        let pattern = compile_query(&query, self.config.matching.literal).map_err(internal)?;

        let span = observe::count_span();
        let count = span.in_scope(|| {
            debug!("count_start");
            let count = count_matches(&documents, &pattern);
            debug!("count_end");
            count
        });

        info!("query '{}' matched count: {}", query.to_lowercase(), count);
        Ok(Response::new(ShakespeareResponse {
            match_count: count as i64,
        }))
    }
}

/// Health service: the unary check always answers SERVING, and the
/// watch stream is a deliberate stub.
#[derive(Debug, Default)]
pub struct HealthService;

#[tonic::async_trait]
impl Health for HealthService {
    /// Always SERVING, regardless of which service name is asked about.
    async fn check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        Ok(Response::new(HealthCheckResponse {
            status: ServingStatus::Serving as i32,
        }))
    }

    type WatchStream = ReceiverStream<Result<HealthCheckResponse, Status>>;

    /// No streaming health state exists: the stream yields exactly one
    /// UNIMPLEMENTED status and terminates. Callers polling health
    /// should use `Check` instead.
    async fn watch(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let (tx, rx) = mpsc::channel(1);
        let terminal = HealthCheckResponse {
            status: ServingStatus::Unimplemented as i32,
        };
        // Capacity 1 buffers the single message; dropping the sender
        // ends the stream immediately after it.
        let _ = tx.send(Ok(terminal)).await;
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
