//! Generative-AI document analysis client
//!
//! Sends one `generateContent` request per document (prompt plus the file as
//! base64 inline data) and returns the model's text answer. No retries: a
//! failed call surfaces as an `Error` row in the caller's batch result.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use pfa_common::config::AiConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::uploads::UploadedFile;

const USER_AGENT: &str = concat!("pfa/", env!("CARGO_PKG_VERSION"));

/// AI client errors
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI extraction is not configured (set [ai] api_key or PFA_AI_API_KEY)")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("AI API error {0}: {1}")]
    Api(u16, String),

    #[error("AI returned an empty response")]
    EmptyResponse,

    #[error("Could not parse AI response: {0}")]
    Parse(String),
}

/// Anything that can turn a document plus prompt into a text answer
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, prompt: &str, document: &UploadedFile) -> Result<String, AiError>;
}

/// Analyzer used when no API key is configured
#[derive(Debug, Default)]
pub struct DisabledAnalyzer;

#[async_trait]
impl DocumentAnalyzer for DisabledAnalyzer {
    async fn analyze(&self, _prompt: &str, _document: &UploadedFile) -> Result<String, AiError> {
        Err(AiError::NotConfigured)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini `generateContent` REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AiError::NotConfigured)?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl DocumentAnalyzer for GeminiClient {
    async fn analyze(&self, prompt: &str, document: &UploadedFile) -> Result<String, AiError> {
        let mime_type = document
            .mime_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type,
                            data: BASE64.encode(&document.bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        debug!(
            model = %self.model,
            file_name = %document.file_name,
            size = document.bytes.len(),
            "Sending document to AI"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), file_name = %document.file_name, "AI request failed");
            return Err(AiError::Api(status.as_u16(), body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        first_text(parsed).ok_or(AiError::EmptyResponse)
    }
}

fn first_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .find(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "read this" },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: BASE64.encode(b"abc"),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "read this");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "YWJj");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_first_text_skips_empty_candidates() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":null},{"content":{"parts":[{"text":"  "},{"text":"{\"a\":1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(response).as_deref(), Some("{\"a\":1}"));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(first_text(empty).is_none());
    }

    #[test]
    fn test_missing_api_key_is_not_configured() {
        let config = AiConfig {
            api_key: Some("   ".to_string()),
            ..AiConfig::default()
        };
        assert!(matches!(GeminiClient::new(&config), Err(AiError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_disabled_analyzer() {
        let doc = UploadedFile::new("a.pdf", b"%PDF-1.4".to_vec());
        let result = DisabledAnalyzer.analyze("prompt", &doc).await;
        assert!(matches!(result, Err(AiError::NotConfigured)));
    }
}
