//! Shared fixtures: a mock tool endpoint served over real HTTP, and a
//! scripted LLM driver.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, routing::post};
use serde_json::{Value, json};

use photopilot::llm::{ChatOutcome, LlmDriver, LlmRequest, ToolCall, ToolCallFunction};

// ─────────────────────────────────────────────────────────────────────────
// Mock tool endpoint (JSON-RPC over HTTP)
// ─────────────────────────────────────────────────────────────────────────

type ToolHandler = dyn Fn(&str, &Value) -> Value + Send + Sync;

struct ServerState {
    tools: Vec<Value>,
    handler: Arc<ToolHandler>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

/// A mock endpoint bound to an ephemeral local port.
#[derive(Clone)]
pub struct ToolServer {
    pub base_url: String,
    /// `(tool_name, arguments)` for every `tools/call` received, in order.
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
}

/// Serve `tools` and answer `tools/call` with `handler`'s result object.
pub async fn spawn_tool_server(
    tools: Vec<Value>,
    handler: impl Fn(&str, &Value) -> Value + Send + Sync + 'static,
) -> ToolServer {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = Arc::new(ServerState {
        tools,
        handler: Arc::new(handler),
        calls: Arc::clone(&calls),
    });

    let app = Router::new().route("/mcp", post(handle)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ToolServer {
        base_url: format!("http://{addr}/mcp"),
        calls,
    }
}

async fn handle(State(state): State<Arc<ServerState>>, Json(req): Json<Value>) -> Json<Value> {
    let method = req["method"].as_str().unwrap_or_default();
    let id = req.get("id").cloned().unwrap_or(Value::Null);

    let result = match method {
        "initialize" => json!({
            "protocolVersion": "2025-03-26",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "mock-photos", "version": "0.0.1" }
        }),
        // Notification: no id, no meaningful response body.
        "notifications/initialized" => return Json(json!({})),
        "tools/list" => json!({ "tools": state.tools }),
        "tools/call" => {
            let name = req["params"]["name"].as_str().unwrap_or_default().to_string();
            let args = req["params"]["arguments"].clone();
            state.calls.lock().unwrap().push((name.clone(), args.clone()));
            (state.handler)(&name, &args)
        }
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("method not found: {method}") }
            }));
        }
    };

    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

/// Declaration of the canonical `search_photos` tool.
pub fn search_photos_tool() -> Value {
    json!({
        "name": "search_photos",
        "description": "Semantic search over the photo library.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search text" },
                "n_results": { "type": "integer", "description": "Number of results" }
            },
            "required": ["query"]
        }
    })
}

/// A `tools/call` result with a single text part.
pub fn text_result(text: &str) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false
    })
}

// ─────────────────────────────────────────────────────────────────────────
// Scripted LLM driver
// ─────────────────────────────────────────────────────────────────────────

/// Driver that replays a fixed script of responses and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedDriver {
    responses: Mutex<VecDeque<ChatOutcome>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedDriver {
    pub fn new(responses: Vec<ChatOutcome>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl LlmDriver for ScriptedDriver {
    async fn complete(&self, req: LlmRequest) -> anyhow::Result<ChatOutcome> {
        self.requests.lock().unwrap().push(req);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("model unavailable"))
    }
}

/// Build a model-requested tool call.
pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: ToolCallFunction {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// An assistant response that only requests tool calls.
pub fn tool_call_outcome(calls: Vec<ToolCall>) -> ChatOutcome {
    ChatOutcome {
        text: String::new(),
        tool_calls: calls,
    }
}

/// An assistant response with final text.
pub fn text_outcome(text: &str) -> ChatOutcome {
    ChatOutcome {
        text: text.to_string(),
        tool_calls: Vec::new(),
    }
}
