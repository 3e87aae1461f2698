//! Error types for each layer of the pipeline.
//!
//! Only [`PersistError`] and [`ConfigError`] are allowed to end a run. Transport
//! and source errors are absorbed at the aggregator boundary and reported as an
//! empty result for the affected source.

use thiserror::Error;

/// A request that produced no usable response.
///
/// Callers treat every variant the same way: the source is unavailable right now.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("could not build http client: {0}")]
    Client(String),
}

/// Why an adapter returned nothing at all.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no endpoint responded: {0}")]
    Unavailable(#[from] FetchError),

    #[error("unexpected document shape: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Malformed(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}
