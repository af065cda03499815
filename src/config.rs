//! TOML configuration parsing.
//!
//! All settings have defaults, so the server runs with no configuration
//! file at all. The reference deployment only overrides the listen port,
//! which is also honored from the `PORT` environment variable (taking
//! precedence over the file).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Listen port. The `PORT` environment variable overrides this.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum number of RPC calls handled concurrently; further calls
    /// queue until a slot frees.
    #[serde(default = "default_handler_concurrency")]
    pub handler_concurrency: usize,
}

fn default_port() -> u16 {
    5050
}
fn default_handler_concurrency() -> usize {
    4
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            handler_concurrency: default_handler_concurrency(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Bucket holding the corpus.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Key prefix under which every corpus document lives.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Region used for request signing.
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Size of the per-request download pool.
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
}

fn default_bucket() -> String {
    "dataflow-samples".to_string()
}
fn default_prefix() -> String {
    "shakespeare/".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_download_concurrency() -> usize {
    8
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            prefix: default_prefix(),
            region: default_region(),
            endpoint_url: None,
            download_concurrency: default_download_concurrency(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MatchingConfig {
    /// Treat the query as a literal substring instead of a regular
    /// expression. The default (false) preserves pattern semantics:
    /// a query like `a.b` matches `axb`.
    #[serde(default)]
    pub literal: bool,
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides.
    ///
    /// A missing path yields the built-in defaults. A present but
    /// unreadable or invalid file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&content).with_context(|| "Failed to parse config file")?
            }
            None => Config::default(),
        };

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: '{}'", port))?;
        }

        if config.server.handler_concurrency == 0 {
            anyhow::bail!("server.handler_concurrency must be > 0");
        }
        if config.storage.download_concurrency == 0 {
            anyhow::bail!("storage.download_concurrency must be > 0");
        }
        if config.storage.bucket.is_empty() {
            anyhow::bail!("storage.bucket must not be empty");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5050);
        assert_eq!(config.server.handler_concurrency, 4);
        assert_eq!(config.storage.bucket, "dataflow-samples");
        assert_eq!(config.storage.prefix, "shakespeare/");
        assert_eq!(config.storage.download_concurrency, 8);
        assert!(!config.matching.literal);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[storage]\nbucket = \"my-corpus\"\nprefix = \"plays/\"\n\n[matching]\nliteral = true\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.storage.bucket, "my-corpus");
        assert_eq!(config.storage.prefix, "plays/");
        assert!(config.matching.literal);
        // Untouched sections keep their defaults
        assert_eq!(config.server.port, 5050);
        assert_eq!(config.storage.download_concurrency, 8);
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\ndownload_concurrency = 0\n").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/shakesearch.toml")));
        assert!(err.is_err());
    }
}
