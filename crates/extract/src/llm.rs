use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::InvestigationError;
use crate::schema::SourceReference;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// Everything the inference boundary needs for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub system_instruction: String,
    /// Prior turns followed by the new user turn
    pub turns: Vec<Turn>,
    pub grounded_search: bool,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReply {
    pub text: String,
    /// `None` when the service returned no grounding metadata at all
    pub citations: Option<Vec<SourceReference>>,
}

/// The hosted model, seen as an opaque request/response boundary.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InvestigationError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            timeout_secs: 120,
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct GeminiTool {
    google_search: serde_json::Value,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: GeminiContent,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            anyhow::bail!("Gemini API key is required. Set GEMINI_API_KEY (or API_KEY).");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    fn to_wire(request: &InferenceRequest) -> GeminiRequest {
        let text_content = |role: Option<&str>, text: &str| GeminiContent {
            role: role.map(str::to_string),
            parts: vec![GeminiPart { text: Some(text.to_string()) }],
        };

        GeminiRequest {
            system_instruction: text_content(None, &request.system_instruction),
            contents: request
                .turns
                .iter()
                .map(|turn| {
                    let role = match turn.role {
                        Role::User => "user",
                        Role::Model => "model",
                    };
                    text_content(Some(role), &turn.text)
                })
                .collect(),
            tools: if request.grounded_search {
                vec![GeminiTool { google_search: serde_json::json!({}) }]
            } else {
                Vec::new()
            },
            generation_config: GenerationConfig { temperature: request.temperature },
        }
    }

    fn from_wire(response: GeminiResponse) -> InferenceReply {
        let Some(candidate) = response.candidates.into_iter().next() else {
            return InferenceReply { text: String::new(), citations: None };
        };

        let text = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        let citations = candidate.grounding_metadata.map(|meta| {
            meta.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .map(|web| SourceReference { uri: web.uri, title: web.title })
                .collect()
        });

        InferenceReply { text, citations }
    }

    async fn send(&self, request: &InferenceRequest) -> Result<InferenceReply> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&Self::to_wire(request))
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Gemini request failed ({}): {}", status, error_text);
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        Ok(Self::from_wire(gemini_response))
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InvestigationError> {
        debug!(model = %self.config.model, turns = request.turns.len(), "Calling Gemini");
        self.send(request)
            .await
            .map_err(|e| InvestigationError::ServiceUnavailable(format!("{:#}", e)))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> InferenceRequest {
        InferenceRequest {
            system_instruction: "brief".into(),
            turns: vec![Turn::user("first"), Turn::model("{}"), Turn::user("second")],
            grounded_search: true,
            temperature: 0.1,
        }
    }

    #[test]
    fn test_wire_request_shape() {
        let wire = serde_json::to_value(GeminiClient::to_wire(&request())).unwrap();

        assert_eq!(wire["systemInstruction"]["parts"][0]["text"], "brief");
        assert!(wire["systemInstruction"].get("role").is_none());
        assert_eq!(wire["contents"].as_array().unwrap().len(), 3);
        assert_eq!(wire["contents"][1]["role"], "model");
        assert_eq!(wire["tools"][0]["google_search"], serde_json::json!({}));
        assert!((wire["generationConfig"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_reply_text_and_citations() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"summary\":"}, {"text": "\"x\"}"}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://example.com", "title": "example.com"}},
                    {"retrievedContext": {}}
                ]}
            }]
        }))
        .unwrap();

        let reply = GeminiClient::from_wire(response);
        assert_eq!(reply.text, "{\"summary\":\"x\"}");
        let citations = reply.citations.unwrap();
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].uri, "https://example.com");
    }

    #[test]
    fn test_reply_without_metadata_has_no_citations() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{}"}]}}]
        }))
        .unwrap();
        assert!(GeminiClient::from_wire(response).citations.is_none());

        let empty: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(GeminiClient::from_wire(empty).text, "");
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        assert!(GeminiClient::new(GeminiConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_service_maps_to_service_unavailable() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "test".into(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ServiceUnavailable);
    }
}
