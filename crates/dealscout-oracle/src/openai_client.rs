//! OpenAI oracle client.
//!
//! Forces structured output through the chat completions `function_call`
//! mechanism.

use std::sync::Arc;

use async_trait::async_trait;
use dealscout_net::RetryingTransport;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{OracleClient, ToolCallResult, ToolDefinition};
use crate::error::OracleError;

/// Default OpenAI model
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
    transport: Arc<RetryingTransport>,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given API key. The model can be
    /// overridden via `OPENAI_MODEL`.
    pub fn new(api_key: String, transport: Arc<RetryingTransport>) -> Self {
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            model,
            http: reqwest::Client::new(),
            transport,
        }
    }

    pub fn with_model(api_key: String, model: &str, transport: Arc<RetryingTransport>) -> Self {
        Self {
            api_key,
            model: model.to_string(),
            http: reqwest::Client::new(),
            transport,
        }
    }
}

#[async_trait]
impl OracleClient for OpenAiClient {
    async fn extract_with_tool(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tool: &ToolDefinition,
    ) -> Result<ToolCallResult, OracleError> {
        debug!(model = %self.model, "calling OpenAI API");

        let request = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": &self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": 0.1,
                "functions": [{
                    "name": &tool.name,
                    "description": &tool.description,
                    "parameters": &tool.parameters
                }],
                "function_call": {"name": &tool.name}
            }))
            .build()?;
        let response = self.transport.execute(request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api { status, body });
        }

        // Response format:
        // { "choices": [{ "message": { "function_call": { "name", "arguments" } } }] }
        #[derive(Deserialize)]
        struct FunctionCall {
            name: String,
            arguments: String, // OpenAI returns arguments as a JSON string
        }
        #[derive(Deserialize)]
        struct Message {
            function_call: Option<FunctionCall>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let response_text = response.text().await?;
        let api_response: ApiResponse = serde_json::from_str(&response_text)
            .map_err(|e| OracleError::MalformedResponse(format!("unparsable response: {e}")))?;

        let function_call = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.function_call)
            .ok_or(OracleError::NoToolCall)?;

        let arguments: serde_json::Value = serde_json::from_str(&function_call.arguments)
            .map_err(|e| {
                OracleError::MalformedResponse(format!("unparsable function arguments: {e}"))
            })?;

        Ok(ToolCallResult {
            tool_name: function_call.name,
            arguments,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscout_net::RetryPolicy;

    #[test]
    fn test_with_model() {
        let transport = Arc::new(RetryingTransport::new(
            reqwest::Client::new(),
            RetryPolicy::default(),
        ));
        let client = OpenAiClient::with_model("test-key".to_string(), "gpt-4o", transport);
        assert_eq!(client.model_name(), "gpt-4o");
        assert_eq!(client.provider_name(), "OpenAI");
    }
}
