//! Generative-AI capability consumed by the flow executor.

mod gemini;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde_json::Value;

use crate::media::MediaRef;

pub use gemini::GeminiClient;

/// One piece of prompt content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Media(MediaRef),
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Overrides the client's default model.
    pub model: Option<String>,
    pub parts: Vec<Part>,
    /// Response schema; when present the model is asked for JSON.
    pub response_schema: Option<Value>,
    /// Ask for spoken audio in this prebuilt voice instead of text.
    pub speech_voice: Option<String>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(prompt.into())],
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub text: Option<String>,
    pub media: Vec<MediaRef>,
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse>;
}
