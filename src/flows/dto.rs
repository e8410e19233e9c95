use serde::Serialize;
use serde_json::Value;

use super::executor::FlowOutput;
use super::registry::PromptTemplate;
use super::schema::Dialect;

/// Catalog entry for `GET /flows`.
#[derive(Debug, Serialize)]
pub struct FlowInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub input: Value,
    /// `null` for free-text flows.
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'static str>,
}

impl From<&PromptTemplate> for FlowInfo {
    fn from(t: &PromptTemplate) -> Self {
        Self {
            name: t.name,
            description: t.description,
            input: t.input.to_schema(Dialect::JsonSchema),
            output: t.output.as_ref().map(|s| s.to_schema(Dialect::JsonSchema)),
            model: t.model,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlowResponse {
    pub flow: String,
    pub output: FlowOutput,
}
