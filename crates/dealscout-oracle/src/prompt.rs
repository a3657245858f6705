//! Prompt rendering for extraction calls.

use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde_json::json;

use crate::error::OracleError;
use crate::RawRecord;

/// System prompt shared by every extraction call.
pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "You extract structured grocery-deal records from noisy scraped data. \
     Always respond by calling the extract_rows function.";

static TEMPLATES: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut hb = Handlebars::new();
    hb.register_template_string(
        "extract_products",
        include_str!("../templates/extract_products.hbs"),
    )
    .expect("extract_products template is valid");
    hb
});

/// Renders the user prompt for one batch of raw records.
pub fn render_extraction_prompt(batch: &[RawRecord]) -> Result<String, OracleError> {
    let payload = serde_json::to_string_pretty(batch)
        .map_err(|e| OracleError::MalformedResponse(format!("unserializable batch: {e}")))?;
    Ok(TEMPLATES.render("extract_products", &json!({ "user_input": payload }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn prompt_embeds_batch_verbatim() {
        let mut record = RawRecord::new();
        record.insert("name".into(), Value::String("Cola 12pk & chips".into()));
        let prompt = render_extraction_prompt(&[record]).expect("render");
        // Triple-stache: no HTML escaping of the payload.
        assert!(prompt.contains("Cola 12pk & chips"));
        assert!(prompt.contains("extract_rows"));
    }
}
