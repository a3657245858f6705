//! Oracle client abstraction.
//!
//! Each provider implements [`OracleClient`]; callers stay provider-agnostic
//! and force structured output through a tool definition.

use async_trait::async_trait;

use crate::error::OracleError;

/// A function/tool the oracle must call to return structured output.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool arguments (standard lowercase dialect;
    /// providers translate to their own dialect where needed).
    pub parameters: serde_json::Value,
}

/// The forced tool call the oracle returned.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Provider-agnostic oracle client.
#[async_trait]
pub trait OracleClient: Send + Sync {
    /// Sends the prompts and returns the forced tool call.
    async fn extract_with_tool(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tool: &ToolDefinition,
    ) -> Result<ToolCallResult, OracleError>;

    fn model_name(&self) -> &str;

    fn provider_name(&self) -> &str;
}
