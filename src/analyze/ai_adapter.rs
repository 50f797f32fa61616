//! Model adapter: one schema-constrained request to the reasoning model.
//!
//! The adapter only transports text. It never retries, never caches, and never
//! makes up an answer when the model is unavailable; acceptance of the reply is
//! the validator's job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::schema::response_schema;
use super::AnalysisRequest;
use crate::config::ModelConfig;
use crate::error::ModelError;

/// Error bodies are cut before they reach logs or responses.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Trait object used by the pipeline (and stubbed in tests).
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the request once and return the raw reply text.
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, ModelError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;

    fn is_configured(&self) -> bool {
        true
    }
}

pub type DynModelClient = Arc<dyn ModelClient>;

/// Google Gemini `generateContent` with JSON output and a response schema.
pub struct GeminiClient {
    http: reqwest::Client,
    cfg: ModelConfig,
    schema: Value,
}

impl GeminiClient {
    pub fn new(cfg: ModelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("idea-validator/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(cfg.timeout())
            .build()
            .context("building model http client")?;
        Ok(Self {
            http,
            cfg,
            schema: response_schema(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.cfg.endpoint, self.cfg.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, ModelError> {
        if !self.is_configured() {
            return Err(ModelError::NotConfigured);
        }
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.cfg.temperature,
                max_output_tokens: self.cfg.max_output_tokens,
                response_mime_type: "application/json",
                response_schema: &self.schema,
            },
        };

        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.cfg.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: text.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;
        let text = extract_text(parsed)?;
        debug!(model = self.cfg.model.as_str(), chars = text.len(), "model reply received");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        !self.cfg.api_key.trim().is_empty()
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(resp: GenerateResponse) -> Result<String, ModelError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ModelError::Blocked(format!("prompt blocked: {reason}")));
    }
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::Decode("response contained no candidates".to_string()))?;
    if let Some(reason) = candidate.finish_reason.as_deref() {
        if matches!(reason, "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT") {
            return Err(ModelError::Blocked(format!("generation stopped: {reason}")));
        }
    }
    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GenerateResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn joins_candidate_parts() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(extract_text(resp).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blocked_prompt_is_not_retryable() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        let err = extract_text(resp).unwrap_err();
        assert!(matches!(err, ModelError::Blocked(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_candidates_is_decode_error() {
        let err = extract_text(parse(r#"{"candidates":[]}"#)).unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
    }

    #[test]
    fn request_body_shape() {
        let schema = response_schema();
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: "sys" }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "prompt" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 100,
                response_mime_type: "application/json",
                response_schema: &schema,
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(v["systemInstruction"].get("role").is_none());
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 100);
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }
}
