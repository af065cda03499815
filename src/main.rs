//! # Shakesearch server binary
//!
//! Starts the gRPC query service. All settings have defaults; the
//! reference deployment runs with no flags at all and only sets `PORT`.
//!
//! ## Usage
//!
//! ```bash
//! shakesearch [--config ./shakesearch.toml] [--log-format json|compact]
//! ```
//!
//! The listen port comes from the `PORT` environment variable (default
//! 5050). Storage credentials, when the corpus bucket is private, come
//! from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use shakesearch::config::Config;
use shakesearch::observe::{self, LogFormat};
use shakesearch::server::run_server;
use shakesearch::store_s3::S3Store;

/// Shakesearch — a gRPC service that counts matching lines across a
/// remote text corpus.
#[derive(Parser)]
#[command(
    name = "shakesearch",
    about = "gRPC query service counting matching lines across a remote text corpus",
    version
)]
struct Cli {
    /// Path to an optional TOML configuration file.
    ///
    /// When omitted, built-in defaults are used (the reference corpus
    /// bucket and prefix, port 5050).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format: `json` or `compact`.
    #[arg(long, default_value = "json")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observe::init(cli.log_format)?;

    let config = Config::load(cli.config.as_deref())?;
    let store = Arc::new(S3Store::from_config(&config.storage));

    run_server(config, store).await
}
