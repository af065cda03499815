//! # Shakesearch
//!
//! A gRPC query service that counts matching lines across a remote text
//! corpus.
//!
//! Clients send a search string over `ShakespeareService.GetMatchCount`;
//! the service lists and downloads every document under a configured
//! object-store prefix, counts how many lines (summed across all
//! documents) contain the query as a case-insensitive pattern, and
//! returns the count. The standard `grpc.health.v1` contract is served
//! on the same listener.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Client  │──▶│ QueryService │──▶│ fetch_corpus  │──▶ object store
//! │  (gRPC)  │   │  (service)   │   │   (fetch)     │     (store_s3)
//! └──────────┘   └──────┬───────┘   └───────────────┘
//!                       │
//!                       ▼
//!                ┌──────────────┐
//!                │count_matches │  "matchcount" span with
//!                │  (matcher)   │  count_start / count_end
//!                └──────────────┘
//! ```
//!
//! Every request re-fetches and re-scans the full corpus; nothing is
//! cached or shared between requests.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment overrides |
//! | [`store`] | Object store trait, error taxonomy, in-memory store |
//! | [`store_s3`] | S3-compatible object store client (SigV4) |
//! | [`fetch`] | Concurrent corpus retrieval |
//! | [`matcher`] | Line-oriented pattern match counting |
//! | [`observe`] | Structured logging and the count span |
//! | [`service`] | gRPC query and health service implementations |
//! | [`server`] | Listener wiring and startup |

pub mod config;
pub mod fetch;
pub mod matcher;
pub mod observe;
pub mod server;
pub mod service;
pub mod store;
pub mod store_s3;

/// Generated types for the `shakesearch.v1` gRPC contract.
pub mod pb {
    tonic::include_proto!("shakesearch.v1");
}

/// Generated types for the `grpc.health.v1` health-check contract.
pub mod health_pb {
    tonic::include_proto!("grpc.health.v1");
}
