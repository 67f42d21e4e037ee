//! Language-model driver trait and conversation turn model.
//!
//! The [`LlmDriver`] trait is the narrow contract with the model collaborator:
//! a message list in, one assistant message (text plus any requested tool
//! calls) out. The [`Orchestrator`] builds the multi-turn tool loop on top.

pub mod chat_completions;
pub mod orchestrator;
pub mod references;
pub mod schema;

pub use chat_completions::ChatCompletionsDriver;
pub use orchestrator::{Orchestrator, ToolTurnRecord, TurnOutcome};

/// LLM connection and model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g. `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
}

/// Role of a conversation turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
    /// Tool result.
    Tool,
}

/// One turn in a conversation.
///
/// Tool-role turns carry the `tool_call_id` of the assistant request they
/// answer; assistant turns that requested calls carry `tool_calls`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    #[must_use]
    pub fn assistant_with_tool_calls(content: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content,
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call, echoed back on the tool turn.
    pub id: String,
    /// Call type (always "function" today).
    #[serde(rename = "type")]
    pub call_type: String,
    /// Function details.
    pub function: ToolCallFunction,
}

/// Function name and raw argument payload of a tool call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// Arguments as a JSON string, exactly as the model produced them.
    pub arguments: String,
}

/// Request to an LLM driver.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Full conversation history, replayed on every call.
    pub messages: Vec<Message>,
    /// Available tools in function-schema form; empty for synthesis calls.
    pub tools: Vec<serde_json::Value>,
}

/// One assistant response: text plus any requested tool calls, in the
/// order the model emitted them.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Trait for LLM completion drivers.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync {
    /// Request one assistant response for the given history.
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator is unreachable, rejects the
    /// request, or responds with an unparseable body.
    async fn complete(&self, req: LlmRequest) -> anyhow::Result<ChatOutcome>;
}
