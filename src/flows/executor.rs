use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::registry::TemplateRegistry;
use super::schema::{Dialect, Violation};
use crate::config::GenAiConfig;
use crate::error::FlowError;
use crate::genai::{GenerateRequest, GenerativeClient};
use crate::media::MediaRef;

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub model: String,
    pub voice: String,
}

impl From<&GenAiConfig> for SpeechSettings {
    fn from(cfg: &GenAiConfig) -> Self {
        Self {
            model: cfg.tts_model.clone(),
            voice: cfg.tts_voice.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlowOutput {
    Structured(Value),
    Text(String),
}

impl FlowOutput {
    pub fn into_value(self) -> Value {
        match self {
            FlowOutput::Structured(v) => v,
            FlowOutput::Text(t) => Value::String(t),
        }
    }

    pub fn into_text(self) -> Result<String, FlowError> {
        match self {
            FlowOutput::Text(t) => Ok(t),
            FlowOutput::Structured(_) => {
                Err(FlowError::Schema("expected free text, got structured output".into()))
            }
        }
    }
}

/// Runs named prompt templates against the generative-AI capability.
#[derive(Clone)]
pub struct FlowExecutor {
    registry: Arc<TemplateRegistry>,
    genai: Arc<dyn GenerativeClient>,
    speech: SpeechSettings,
}

impl FlowExecutor {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        genai: Arc<dyn GenerativeClient>,
        speech: SpeechSettings,
    ) -> Self {
        Self {
            registry,
            genai,
            speech,
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    #[instrument(skip(self, input))]
    pub async fn execute(&self, name: &str, input: &Value) -> Result<FlowOutput, FlowError> {
        let template = self
            .registry
            .get(name)
            .ok_or_else(|| FlowError::UnknownFlow(name.to_string()))?;

        template.input.validate(input).map_err(|v| {
            warn!(violation = %v, "flow input rejected");
            FlowError::Validation(v)
        })?;
        let input = template.input.prune(input.clone());
        let parts = template.instruction.render(&input)?;

        let mut request = GenerateRequest {
            parts,
            response_schema: template
                .output
                .as_ref()
                .map(|s| s.to_schema(Dialect::ResponseSchema)),
            ..Default::default()
        };
        if let Some(model) = template.model {
            request = request.with_model(model);
        }

        let response = self.genai.generate(request).await.map_err(|e| {
            error!(error = %e, "generation failed");
            FlowError::Generation(e.to_string())
        })?;
        let text = response
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FlowError::Generation("model returned no text".into()))?;

        let Some(shape) = &template.output else {
            debug!(chars = text.len(), "free text output");
            return Ok(FlowOutput::Text(text));
        };
        let value: Value = serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            warn!(error = %e, "model output is not JSON");
            FlowError::Schema(format!("output is not JSON: {}", e))
        })?;
        shape.validate(&value).map_err(|v| {
            warn!(violation = %v, "model output rejected");
            FlowError::Schema(v.to_string())
        })?;
        Ok(FlowOutput::Structured(shape.prune(value)))
    }

    pub async fn execute_typed<I, O>(&self, name: &str, input: &I) -> Result<O, FlowError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)
            .map_err(|e| FlowError::Validation(Violation::root(e.to_string())))?;
        let output = self.execute(name, &input).await?;
        serde_json::from_value(output.into_value()).map_err(|e| FlowError::Schema(e.to_string()))
    }

    /// Synthesizes speech for `text` and returns the raw audio part.
    #[instrument(skip(self, text))]
    pub async fn speak(&self, text: &str) -> Result<MediaRef, FlowError> {
        let request = GenerateRequest {
            speech_voice: Some(self.speech.voice.clone()),
            ..GenerateRequest::text(text)
        }
        .with_model(self.speech.model.as_str());

        let response = self.genai.generate(request).await.map_err(|e| {
            error!(error = %e, "speech synthesis failed");
            FlowError::Generation(e.to_string())
        })?;
        response
            .media
            .into_iter()
            .find(|m| !m.data.is_empty())
            .ok_or_else(|| FlowError::Generation("speech synthesis returned no audio".into()))
    }
}

/// Unwraps a single surrounding Markdown code fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    match body.find('\n') {
        Some(i) if !body[..i].trim_start().starts_with(['{', '[']) => body[i + 1..].trim(),
        _ => body.trim(),
    }
}

#[cfg(test)]
impl FlowExecutor {
    pub(crate) fn scripted(client: Arc<crate::genai::testing::ScriptedClient>) -> Self {
        let registry = TemplateRegistry::builtin().expect("builtin templates parse");
        Self::new(
            Arc::new(registry),
            client,
            SpeechSettings {
                model: "tts-test".into(),
                voice: "Algenib".into(),
            },
        )
    }
}
