//! Error types for each stage of the harvest pipeline.
//!
//! Only [`ConfigError`] and [`LedgerError`] raised during start-up are allowed
//! to end the process. Everything else is logged by the crawler and absorbed
//! at site or article granularity.

use thiserror::Error;

/// Failure to retrieve a URL over HTTP.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not build HTTP client: {0}")]
    Client(String),
}

/// A page body that could not be turned into a [`crate::document::Document`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document is empty")]
    Empty,
}

/// A structural path expression outside the supported grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path expression must start with '/': {0}")]
    NotAbsolute(String),

    #[error("unexpected input at offset {offset} in {expr}")]
    Syntax { expr: String, offset: usize },

    #[error("unsupported predicate `{0}`")]
    UnsupportedPredicate(String),

    #[error("compiled selector rejected: {0}")]
    Selector(String),
}

/// Failure talking to the persistent URL ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure delivering an article to one of the configured sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Unreadable or invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("site #{index}: {reason}")]
    Site { index: usize, reason: String },

    #[error("database backend `sqlite` requires `db.path`")]
    MissingSqlitePath,

    #[error("`sinks.managed_content` requires the `mysql` database backend")]
    ManagedContentRequiresMysql,
}
