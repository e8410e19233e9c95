use anyhow::Context;
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::{GenerateRequest, GenerateResponse, GenerativeClient, Part};
use crate::config::GenAiConfig;
use crate::media::MediaRef;

// ---- wire types ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: WireBlob,
    },
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    candidates: Option<Vec<WireCandidate>>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

// ---- client ----

/// Google Generative Language API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GeminiClient {
    pub fn new(cfg: &GenAiConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            default_model: cfg.model.clone(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request(request: &GenerateRequest) -> WireRequest {
        let parts = request
            .parts
            .iter()
            .map(|p| match p {
                Part::Text(text) => WirePart::Text { text: text.clone() },
                Part::Media(m) => WirePart::Inline {
                    inline_data: WireBlob {
                        mime_type: m.mime_type.clone(),
                        data: Base64::encode_string(&m.data),
                    },
                },
            })
            .collect();

        let generation_config = if let Some(voice) = &request.speech_voice {
            Some(WireGenerationConfig {
                response_modalities: Some(vec!["AUDIO".into()]),
                speech_config: Some(serde_json::json!({
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                })),
                ..Default::default()
            })
        } else {
            request.response_schema.as_ref().map(|schema| WireGenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(schema.clone()),
                ..Default::default()
            })
        };

        WireRequest {
            contents: vec![WireContent {
                role: Some("user".into()),
                parts,
            }],
            generation_config,
        }
    }

    fn collect_response(resp: WireResponse) -> anyhow::Result<GenerateResponse> {
        if let Some(err) = resp.error {
            anyhow::bail!("generative api error: {}", err.message);
        }
        let parts = resp
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut out = GenerateResponse::default();
        let mut text = String::new();
        for part in parts {
            match part {
                WirePart::Text { text: t } => text.push_str(&t),
                WirePart::Inline { inline_data } => {
                    let data = Base64::decode_vec(&inline_data.data)
                        .map_err(|e| anyhow::anyhow!("inline data is not base64: {}", e))?;
                    out.media.push(MediaRef::new(inline_data.mime_type, data));
                }
                WirePart::Other(_) => {}
            }
        }
        if !text.is_empty() {
            out.text = Some(text);
        }
        Ok(out)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    #[instrument(skip(self, request), fields(model = tracing::field::Empty))]
    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let model = request.model.as_deref().unwrap_or(&self.default_model).to_string();
        tracing::Span::current().record("model", model.as_str());

        let body = Self::build_request(&request);
        let resp = self
            .http
            .post(self.endpoint(&model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("generative api request")?;

        let status = resp.status();
        let raw = resp.text().await.context("read generative api response")?;
        if !status.is_success() {
            error!(%status, "generative api returned an error status");
            anyhow::bail!("generative api status {}: {}", status, raw);
        }

        let parsed: WireResponse =
            serde_json::from_str(&raw).context("decode generative api response")?;
        let out = Self::collect_response(parsed)?;
        debug!(
            has_text = out.text.is_some(),
            media = out.media.len(),
            "generation complete"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_request_carries_schema() {
        let req = GenerateRequest {
            parts: vec![
                Part::Text("Analyze:".into()),
                Part::Media(MediaRef::new("image/png", vec![1, 2, 3])),
            ],
            response_schema: Some(serde_json::json!({"type": "OBJECT"})),
            ..Default::default()
        };
        let wire = serde_json::to_value(GeminiClient::build_request(&req)).unwrap();

        let parts = &wire["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "Analyze:");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert_eq!(wire["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(wire["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn speech_request_asks_for_audio() {
        let req = GenerateRequest {
            speech_voice: Some("Algenib".into()),
            ..GenerateRequest::text("hello")
        };
        let wire = serde_json::to_value(GeminiClient::build_request(&req)).unwrap();
        assert_eq!(wire["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            wire["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Algenib"
        );
        assert!(wire["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn plain_request_has_no_generation_config() {
        let wire = serde_json::to_value(GeminiClient::build_request(&GenerateRequest::text("hi")))
            .unwrap();
        assert!(wire.get("generationConfig").is_none());
    }

    #[test]
    fn collects_text_and_audio_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Hello "},
                        {"text": "there"},
                        {"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAEC"}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let parsed: WireResponse = serde_json::from_str(raw).unwrap();
        let out = GeminiClient::collect_response(parsed).unwrap();
        assert_eq!(out.text.as_deref(), Some("Hello there"));
        assert_eq!(out.media.len(), 1);
        assert_eq!(out.media[0].data, vec![0, 1, 2]);
    }

    #[test]
    fn surfaces_api_error() {
        let raw = r#"{"error": {"code": 429, "message": "quota exceeded"}}"#;
        let parsed: WireResponse = serde_json::from_str(raw).unwrap();
        let err = GeminiClient::collect_response(parsed).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
