//! Oracle client construction.

use std::sync::Arc;

use dealscout_net::RetryingTransport;
use tracing::info;

use crate::backend::OracleBackend;
use crate::client::OracleClient;
use crate::error::OracleError;
use crate::gemini_client::GeminiClient;
use crate::openai_client::OpenAiClient;

/// Builds the oracle client selected by `ORACLE_BACKEND`, layered over the
/// shared retrying transport.
pub fn create_oracle_client(
    transport: Arc<RetryingTransport>,
) -> Result<Arc<dyn OracleClient>, OracleError> {
    let backend = OracleBackend::from_env();
    let client: Arc<dyn OracleClient> = match backend {
        OracleBackend::Gemini => {
            let api_key = std::env::var("GOOGLE_API_KEY")
                .map_err(|_| OracleError::MissingApiKey("GOOGLE_API_KEY"))?;
            Arc::new(GeminiClient::new(api_key, transport))
        }
        OracleBackend::OpenAi => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| OracleError::MissingApiKey("OPENAI_API_KEY"))?;
            Arc::new(OpenAiClient::new(api_key, transport))
        }
    };
    info!(
        backend = backend.as_str(),
        model = client.model_name(),
        "oracle client ready"
    );
    Ok(client)
}
