//! Retrying HTTP transport.
//!
//! Every outbound integration (source connectors, oracle clients) sends its
//! requests through [`RetryingTransport`], which replays transient failures
//! with exponential backoff. The wrapper is pure decoration: it knows nothing
//! about request semantics and is safe to share across concurrent callers.

pub mod transport;

pub use transport::{HttpSend, RetryPolicy, RetryingTransport, TransportError};
