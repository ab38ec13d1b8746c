use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Black-box text completion service. One system prompt and one user
/// prompt in, free text out.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Client for OpenAI-compatible chat completion endpoints
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": 0.1,
        });

        // Reasoning models spend part of the budget before the visible answer
        if self.model.starts_with("gpt-5") || self.model.contains("o1") {
            body["max_completion_tokens"] = serde_json::json!(2000);
        } else {
            body["max_tokens"] = serde_json::json!(1000);
        }
        body
    }
}

#[async_trait]
impl GenerationCapability for LlmClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = self.request_body(system_prompt, user_prompt);

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Llm(format!("LLM API call timed out: {}", e))
                } else {
                    PipelineError::Llm(format!("LLM API call failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Llm(format!("LLM API error ({}): {}", status, error_text)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Pull the first choice's message text out of a chat completion payload
fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(PipelineError::Llm(format!("LLM API error: {}", error)));
    }

    let choice = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| PipelineError::Llm("No choices in LLM response".to_string()))?;

    match choice.get("finish_reason").and_then(|r| r.as_str()) {
        Some("length") => warn!("LLM response was truncated due to length limit"),
        Some("content_filter") => {
            return Err(PipelineError::Llm(
                "LLM response was filtered by content policy".to_string(),
            ))
        }
        _ => {}
    }

    choice["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PipelineError::Llm("No content in LLM response".to_string()))
}
