//! Hosted language-model client
//!
//! `LanguageModel` is the seam every model-backed stage talks to; `OpenAiClient`
//! implements it against the Responses API with strict `json_schema` output.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Model call errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model API key not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Schema violation: {0}")]
    Schema(String),
}

/// Request for a JSON object matching `schema`
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    /// Schema name sent with the format descriptor
    pub name: String,
    pub system: Option<String>,
    pub user: String,
    pub schema: Value,
    pub temperature: Option<f32>,
}

/// Request for free text
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: Option<String>,
    pub user: String,
    pub temperature: Option<f32>,
}

/// Hosted language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Parsed JSON payload of a structured-output call
    async fn complete_json(&self, request: StructuredRequest) -> Result<Value, ModelError>;

    async fn complete_text(&self, request: TextRequest) -> Result<String, ModelError>;
}

/// OpenAI Responses API client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn post_responses(&self, body: Value) -> Result<Value, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::NotConfigured)?;
        let url = format!("{}/responses", self.base_url);

        tracing::debug!(model = %self.model, url = %url, "Calling model API");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(status.as_u16(), error_text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))
    }

    fn input_messages(system: Option<&str>, user: &str) -> Value {
        let mut input = Vec::new();
        if let Some(system) = system {
            input.push(json!({
                "role": "system",
                "content": [{ "type": "input_text", "text": system }]
            }));
        }
        input.push(json!({
            "role": "user",
            "content": [{ "type": "input_text", "text": user }]
        }));
        Value::Array(input)
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, request: StructuredRequest) -> Result<Value, ModelError> {
        let mut body = json!({
            "model": self.model,
            "input": Self::input_messages(request.system.as_deref(), &request.user),
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": request.name,
                    "schema": request.schema,
                    "strict": true
                }
            }
        });
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }

        let payload = self.post_responses(body).await?;
        let text = extract_output_text(&payload)
            .ok_or_else(|| ModelError::Parse("response has no output_text".to_string()))?;

        serde_json::from_str(&text).map_err(|e| ModelError::Parse(e.to_string()))
    }

    async fn complete_text(&self, request: TextRequest) -> Result<String, ModelError> {
        let mut body = json!({
            "model": self.model,
            "input": Self::input_messages(request.system.as_deref(), &request.user),
        });
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }

        let payload = self.post_responses(body).await?;
        Ok(extract_output_text(&payload).unwrap_or_default())
    }
}

/// Concatenated `output_text` of a Responses API payload
///
/// Accepts the top-level `output_text` convenience field or the
/// `output[].content[]` items of type `output_text`.
pub fn extract_output_text(payload: &Value) -> Option<String> {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let parts: Vec<&str> = payload
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|c| c.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|c| c.get("text").and_then(Value::as_str))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}
