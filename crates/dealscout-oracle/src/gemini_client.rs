//! Gemini oracle client.
//!
//! Calls the `generateContent` endpoint with a function declaration and a
//! tool config that forces the `extract_rows` call.

use std::sync::Arc;

use async_trait::async_trait;
use dealscout_net::RetryingTransport;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{OracleClient, ToolCallResult, ToolDefinition};
use crate::error::OracleError;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
    transport: Arc<RetryingTransport>,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key. The model can be
    /// overridden via `GEMINI_MODEL`.
    pub fn new(api_key: String, transport: Arc<RetryingTransport>) -> Self {
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
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

/// Translates a standard JSON Schema fragment into Gemini's OpenAPI-style
/// dialect: uppercase `type` tokens, unsupported keywords dropped.
fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "type" => {
                        if let Some(ty) = value.as_str() {
                            out.insert("type".into(), Value::String(ty.to_ascii_uppercase()));
                        }
                    }
                    "additionalProperties" => {}
                    _ => {
                        out.insert(key.clone(), to_gemini_schema(value));
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

#[async_trait]
impl OracleClient for GeminiClient {
    async fn extract_with_tool(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tool: &ToolDefinition,
    ) -> Result<ToolCallResult, OracleError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": format!("{system_prompt}\n{user_prompt}") }]
            }],
            "tools": [{
                "functionDeclarations": [{
                    "name": &tool.name,
                    "description": &tool.description,
                    "parameters": to_gemini_schema(&tool.parameters)
                }]
            }],
            "toolConfig": {
                "functionCallingConfig": {
                    "mode": "ANY",
                    "allowedFunctionNames": [&tool.name]
                }
            },
            "generationConfig": { "temperature": 0.1 }
        });

        let url = format!(
            "{BASE_URL}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        debug!(model = %self.model, "calling Gemini API");

        let request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .build()?;
        let response = self.transport.execute(request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api { status, body });
        }

        let payload: Value = response.json().await?;
        let parts = payload
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.pointer("/content/parts"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                OracleError::MalformedResponse("no candidate content parts".to_string())
            })?;

        let function_call = parts
            .iter()
            .find_map(|part| part.get("functionCall"))
            .ok_or(OracleError::NoToolCall)?;

        let name = function_call
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&tool.name)
            .to_string();
        let arguments = function_call
            .get("args")
            .cloned()
            .ok_or_else(|| OracleError::MalformedResponse("function call has no args".into()))?;

        Ok(ToolCallResult {
            tool_name: name,
            arguments,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscout_net::RetryPolicy;

    fn transport() -> Arc<RetryingTransport> {
        Arc::new(RetryingTransport::new(
            reqwest::Client::new(),
            RetryPolicy::default(),
        ))
    }

    #[test]
    fn test_with_model() {
        let client = GeminiClient::with_model("test-key".to_string(), "gemini-pro", transport());
        assert_eq!(client.model_name(), "gemini-pro");
        assert_eq!(client.provider_name(), "Gemini");
    }

    #[test]
    fn schema_translation_uppercases_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "products": { "type": "array", "items": { "type": "string" } }
            }
        });
        let translated = to_gemini_schema(&schema);
        assert_eq!(translated["type"], "OBJECT");
        assert_eq!(translated["properties"]["products"]["type"], "ARRAY");
        assert_eq!(translated["properties"]["products"]["items"]["type"], "STRING");
    }
}
