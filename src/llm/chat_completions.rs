//! OpenAI-compatible Chat Completions driver (`/v1/chat/completions`).
//!
//! Non-streaming: the orchestrator's state machine consumes whole assistant
//! messages, so each call is a single request/response exchange.

use anyhow::Context;

use super::{ChatOutcome, LlmDriver, LlmRequest, LlmSettings, ToolCall};

/// Transport timeout for model calls. Generous: multi-tool prompts over a
/// local inference server can take tens of seconds.
const MODEL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(90);

/// Driver for the OpenAI Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    pub fn new(settings: LlmSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(MODEL_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, settings })
    }
}

#[async_trait::async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn complete(&self, req: LlmRequest) -> anyhow::Result<ChatOutcome> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.settings.model,
            "stream": false,
            "messages": req.messages,
            "tools": if req.tools.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::Array(req.tools)
            },
        });

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb
            .send()
            .await
            .context("model request failed")?
            .error_for_status()
            .context("model rejected request")?;

        let v: serde_json::Value = resp.json().await.context("unparseable model response")?;
        let message = &v["choices"][0]["message"];

        let text = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();

        let tool_calls: Vec<ToolCall> = message
            .get("tool_calls")
            .map(|tc| serde_json::from_value(tc.clone()))
            .transpose()
            .context("malformed tool_calls in model response")?
            .unwrap_or_default();

        tracing::debug!(
            text_length = text.len(),
            tool_call_count = tool_calls.len(),
            "Model response received"
        );

        Ok(ChatOutcome { text, tool_calls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_reports_builder_failures() {
        let driver = ChatCompletionsDriver::new(LlmSettings {
            base_url: "http://127.0.0.1:1234".to_string(),
            api_key: None,
            model: "test-model".to_string(),
        });
        assert!(driver.is_ok());
    }
}
