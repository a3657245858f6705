//! Oracle error taxonomy.

use dealscout_net::TransportError;
use reqwest::StatusCode;
use thiserror::Error;

/// Failures of one oracle call. Malformed output is an error, never a silent
/// empty success; the pipeline's reprocessing pass handles all of these.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("oracle API error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("oracle returned no tool call")]
    NoToolCall,

    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("prompt template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("missing API key: {0} environment variable not set")]
    MissingApiKey(&'static str),
}
