//! Error types for genie-client.

use thiserror::Error;

use genie_core::ConfigError;

/// Errors from calls against the workspace service. None of them are retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with a non-success status (auth failure, not found, ...).
    #[error("{method} {path} failed with HTTP {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    /// Connection, TLS or DNS failure before a response arrived.
    #[error("{method} {path} transport error: {message}")]
    Transport {
        method: &'static str,
        path: String,
        message: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("cannot decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// `serialized_space` was present but is not a JSON document.
    #[error("serialized_space for space {space_id} is not valid JSON: {source}")]
    InvalidSerializedSpace {
        space_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A field the caller depends on is absent from the response.
    #[error("response from {path} is missing '{field}'")]
    MissingField { path: String, field: &'static str },

    /// Secret value could not be decoded into a UTF-8 token.
    #[error("secret {scope}/{key} could not be decoded: {reason}")]
    SecretDecode {
        scope: String,
        key: String,
        reason: String,
    },

    /// A SQL statement reached a terminal state other than success.
    #[error("statement {statement_id} ended in state {state}: {message}")]
    Statement {
        statement_id: String,
        state: String,
        message: String,
    },

    /// Host or path could not be turned into a request URL.
    #[error("invalid request url: {0}")]
    Url(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
