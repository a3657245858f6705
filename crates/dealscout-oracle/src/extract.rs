//! One oracle call: a batch of raw records in, partial product rows out.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::client::OracleClient;
use crate::error::OracleError;
use crate::prompt::{render_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use crate::tool::extract_rows_tool;
use crate::{RawProduct, RawRecord};

/// Provider-agnostic product extraction over an [`OracleClient`].
#[derive(Clone)]
pub struct ProductExtractor {
    client: Arc<dyn OracleClient>,
}

impl ProductExtractor {
    pub fn new(client: Arc<dyn OracleClient>) -> Self {
        Self { client }
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Extracts product rows for one batch.
    ///
    /// An empty `products` array is returned as an empty vec - deciding
    /// whether that is a soft failure is the pipeline's call. A missing or
    /// non-array `products` field is a malformed response and errors.
    pub async fn extract_products(
        &self,
        batch: &[RawRecord],
    ) -> Result<Vec<RawProduct>, OracleError> {
        let user_prompt = render_extraction_prompt(batch)?;
        let tool = extract_rows_tool();

        let result = self
            .client
            .extract_with_tool(EXTRACTION_SYSTEM_PROMPT, &user_prompt, &tool)
            .await?;

        let products = result
            .arguments
            .get("products")
            .ok_or_else(|| OracleError::MalformedResponse("missing products field".to_string()))?;
        let items = products.as_array().ok_or_else(|| {
            OracleError::MalformedResponse("products field is not an array".to_string())
        })?;

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(map) => rows.push(map.clone()),
                other => {
                    return Err(OracleError::MalformedResponse(format!(
                        "non-object product entry: {other}"
                    )))
                }
            }
        }

        debug!(
            batch_len = batch.len(),
            products = rows.len(),
            "oracle batch extracted"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ToolCallResult, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedOracle {
        arguments: Value,
    }

    #[async_trait]
    impl OracleClient for CannedOracle {
        async fn extract_with_tool(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            tool: &ToolDefinition,
        ) -> Result<ToolCallResult, OracleError> {
            Ok(ToolCallResult {
                tool_name: tool.name.clone(),
                arguments: self.arguments.clone(),
            })
        }

        fn model_name(&self) -> &str {
            "canned"
        }

        fn provider_name(&self) -> &str {
            "Canned"
        }
    }

    fn batch_of_one() -> Vec<RawRecord> {
        let mut record = RawRecord::new();
        record.insert("name".into(), Value::String("Cola 12pk $4.99".into()));
        vec![record]
    }

    #[tokio::test]
    async fn extracts_product_objects() {
        let extractor = ProductExtractor::new(Arc::new(CannedOracle {
            arguments: json!({ "products": [{ "brand_name": "Coca-Cola" }] }),
        }));
        let products = extractor
            .extract_products(&batch_of_one())
            .await
            .expect("products");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["brand_name"], "Coca-Cola");
    }

    #[tokio::test]
    async fn empty_products_is_not_an_error() {
        let extractor = ProductExtractor::new(Arc::new(CannedOracle {
            arguments: json!({ "products": [] }),
        }));
        let products = extractor
            .extract_products(&batch_of_one())
            .await
            .expect("products");
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn missing_products_field_is_malformed() {
        let extractor = ProductExtractor::new(Arc::new(CannedOracle {
            arguments: json!({ "rows": [] }),
        }));
        let err = extractor
            .extract_products(&batch_of_one())
            .await
            .expect_err("error");
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }
}
