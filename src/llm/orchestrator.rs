//! Conversation orchestrator with tool loop execution.
//!
//! One user turn drives the state machine
//! `Idle -> AwaitingModel -> (ToolExecuting)* -> AwaitingFinalModel -> Idle`:
//!
//! 1. Call the model with the replayed history plus the current tool catalog.
//! 2. If the response requests tool calls, execute them sequentially in the
//!    order the model gave, feeding each result (or its error text) back as a
//!    tool turn.
//! 3. Ask the model once more, without the catalog, for the final synthesis.
//!
//! Model-call failures propagate to the caller without committing any turn,
//! so the session stays in its last consistent state. Tool failures never
//! unwind the turn: the model sees the error text and may recover.

use std::sync::Arc;

use uuid::Uuid;

use crate::mcp::registry::ToolRegistry;
use crate::session::Session;

use super::references::extract_references;
use super::schema::to_function_spec;
use super::{ChatCompletionsDriver, LlmDriver, LlmRequest, LlmSettings, Message};

/// Cap on tool result text fed back to the model, to bound context size
/// and latency.
const TOOL_RESULT_MAX_CHARS: usize = 5_000;

/// Outcome of one orchestrated user turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant's final natural-language reply.
    pub reply: String,
    /// Tool executions performed during the turn, in execution order.
    pub tool_turns: Vec<ToolTurnRecord>,
    /// Photo identifiers recovered from tool output, for UI enrichment.
    pub references: Vec<String>,
}

/// Record of one executed tool call.
#[derive(Debug, Clone)]
pub struct ToolTurnRecord {
    pub tool_call_id: String,
    pub name: String,
    /// The (possibly truncated) text appended to history.
    pub content: String,
    pub success: bool,
}

/// Orchestrator owning the model driver and the tool registry.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    driver: Arc<dyn LlmDriver>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator backed by the Chat Completions driver.
    pub fn new(settings: LlmSettings, registry: Arc<ToolRegistry>) -> anyhow::Result<Self> {
        Ok(Self {
            registry,
            driver: Arc::new(ChatCompletionsDriver::new(settings)?),
        })
    }

    /// Create an orchestrator with an explicit driver (tests, alternate APIs).
    #[must_use]
    pub fn with_driver(driver: Arc<dyn LlmDriver>, registry: Arc<ToolRegistry>) -> Self {
        Self { registry, driver }
    }

    /// Run one user turn against the session's conversation.
    ///
    /// On success the user turn, any tool round, and the final assistant turn
    /// are appended to the session. On a model-call error nothing is appended.
    pub async fn send(&self, session: &Session, user_text: &str) -> anyhow::Result<TurnOutcome> {
        let request_id = Uuid::new_v4();
        let catalog = self.registry.aggregate_tools().await;
        let tools: Vec<serde_json::Value> = catalog.iter().map(to_function_spec).collect();

        tracing::info!(
            %request_id,
            session = session.id(),
            tool_count = tools.len(),
            "Starting orchestrated turn"
        );

        // Turns staged here commit to the session only when the whole turn
        // succeeds.
        let history = session.messages_with_system();
        let mut staged: Vec<Message> = vec![Message::user(user_text)];

        let first = self
            .driver
            .complete(LlmRequest {
                messages: [history.clone(), staged.clone()].concat(),
                tools,
            })
            .await?;

        // No tool round requested: surface the text directly.
        if first.tool_calls.is_empty() {
            staged.push(Message::assistant(first.text.clone()));
            session.append_messages(staged);
            return Ok(TurnOutcome {
                reply: first.text,
                tool_turns: Vec::new(),
                references: Vec::new(),
            });
        }

        staged.push(Message::assistant_with_tool_calls(
            first.text.clone(),
            first.tool_calls.clone(),
        ));

        let mut tool_turns = Vec::new();
        let mut references: Vec<String> = Vec::new();

        // Execute sequentially, in the order the model returned. Consumers
        // rely on tool turns appearing in exactly this order.
        for call in &first.tool_calls {
            let name = &call.function.name;
            let arguments: serde_json::Value = serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));

            tracing::info!(%request_id, tool = %name, call_id = %call.id, "Executing tool call");

            let (content, success) = match self.registry.call_tool(name, arguments).await {
                Ok(result) => {
                    let text = result.text();
                    for r in extract_references(&text) {
                        if !references.contains(&r) {
                            references.push(r);
                        }
                    }
                    (truncate_tool_result(&text), !result.is_error)
                }
                Err(e) => {
                    // Error text becomes the tool turn so the model can
                    // recover conversationally instead of the turn aborting.
                    tracing::warn!(%request_id, tool = %name, error = %e, "Tool call failed");
                    (format!("tool {name} failed: {e}"), false)
                }
            };

            staged.push(Message::tool_result(call.id.clone(), content.clone()));
            tool_turns.push(ToolTurnRecord {
                tool_call_id: call.id.clone(),
                name: name.clone(),
                content,
                success,
            });
        }

        // Synthesis call: catalog omitted, the model already acted on tools
        // this round.
        let second = self
            .driver
            .complete(LlmRequest {
                messages: [history, staged.clone()].concat(),
                tools: Vec::new(),
            })
            .await?;

        staged.push(Message::assistant(second.text.clone()));
        session.append_messages(staged);

        tracing::info!(
            %request_id,
            tool_turn_count = tool_turns.len(),
            reference_count = references.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            reply: second.text,
            tool_turns,
            references,
        })
    }
}

/// Truncate tool result text to [`TOOL_RESULT_MAX_CHARS`] characters,
/// appending a marker that names the original length.
///
/// The cut is at a fixed character count, possibly mid-line.
fn truncate_tool_result(text: &str) -> String {
    let total = text.chars().count();
    if total <= TOOL_RESULT_MAX_CHARS {
        return text.to_string();
    }

    let mut out: String = text.chars().take(TOOL_RESULT_MAX_CHARS).collect();
    out.push_str(&format!("...[truncated, {total} chars]"));
    out
}
