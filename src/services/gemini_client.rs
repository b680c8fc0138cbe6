use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use super::model::{ModelCall, TextModel};
use crate::core::{credentials::Credential, history::ModelTurn};
use crate::error::{GatewayError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// `generateContent` client for the Gemini REST API.
///
/// Quota and rate-limit rejections come back as [`GatewayError::Quota`]; the
/// client never retries on its own, rotation is the caller's job.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_http_client(DEFAULT_TIMEOUT)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = build_http_client(timeout)?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_content(&self, api_key: &str, body: &Value) -> Result<String> {
        let request_url = build_generate_url(&self.base_url, &self.model);

        let response = self
            .http
            .post(&request_url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| GatewayError::Upstream(format!("HTTP request failed: {err}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|err| GatewayError::Upstream(format!("Failed to read response: {err}")))?;

        debug!(
            target: "wanderai::gemini",
            status = status.as_u16(),
            bytes = response_text.len(),
            model = %self.model
        );

        let response_json: Option<Value> = serde_json::from_str(&response_text).ok();

        if !status.is_success() {
            let (api_status, api_message) = response_json
                .as_ref()
                .and_then(|value| value.get("error"))
                .map(|error| {
                    (
                        error.get("status").and_then(Value::as_str).unwrap_or_default(),
                        error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or_default(),
                    )
                })
                .unwrap_or(("", ""));
            let message = if api_message.is_empty() {
                response_text.clone()
            } else {
                api_message.to_string()
            };

            if is_quota_rejection(status, api_status, &message) {
                return Err(GatewayError::Quota {
                    credential_index: 0,
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                });
            }

            return Err(GatewayError::Upstream(format!(
                "HTTP {} error: {}",
                status, message
            )));
        }

        let response_json = response_json.ok_or_else(|| {
            GatewayError::Upstream("Failed to parse JSON from model response".to_string())
        })?;

        extract_text(&response_json)
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, credential: &Credential, call: &ModelCall) -> Result<String> {
        let body = GenerateContentRequest::new(call.prompt.clone())
            .with_history(call.history.clone())
            .with_max_output_tokens(call.max_output_tokens)
            .into_value();

        self.generate_content(credential.expose(), &body).await
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| GatewayError::Config(format!("Failed to build HTTP client: {err}")))
}

fn build_generate_url(base_url: &str, model: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(":generateContent") {
        trimmed.to_string()
    } else {
        format!("{}/models/{}:generateContent", trimmed, model)
    }
}

fn is_quota_rejection(status: StatusCode, api_status: &str, message: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
        return true;
    }
    let lowered = message.to_lowercase();
    lowered.contains("quota") || lowered.contains("rate limit")
}

fn extract_text(response: &Value) -> Result<String> {
    if let Some(reason) = response
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Err(GatewayError::Upstream(format!("Prompt blocked: {reason}")));
    }

    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            GatewayError::Upstream("Model response contained no candidates".to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(GatewayError::Upstream(
            "Model response contained no text".to_string(),
        ));
    }

    Ok(text)
}

#[derive(Clone, Debug)]
pub struct GenerateContentRequest {
    prompt: String,
    history: Vec<ModelTurn>,
    max_output_tokens: Option<u32>,
}

impl GenerateContentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            max_output_tokens: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ModelTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn into_value(self) -> Value {
        let mut contents: Vec<Value> = self
            .history
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role.as_str(),
                    "parts": [{ "text": turn.content }]
                })
            })
            .collect();
        contents.push(json!({
            "role": "user",
            "parts": [{ "text": self.prompt }]
        }));

        let mut body = json!({ "contents": contents });

        if let Some(max_output_tokens) = self.max_output_tokens {
            body["generationConfig"] = json!({ "maxOutputTokens": max_output_tokens });
        }

        body
    }
}
