//! HTTP transport for the tool-invocation protocol.
//!
//! Each [`HttpMcpClient`] talks to one endpoint; every operation is a single
//! JSON-RPC request/response exchange over HTTP POST. Nothing streams.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;
use url::Url;

use crate::mcp::types::{
    CallToolResult, InitializeResult, JSONRPC_VERSION, JsonRpcResponse, ListToolsResult, McpTool,
    PROTOCOL_VERSION,
};

/// Errors from a single protocol exchange.
///
/// `Transport` and `Malformed` mean the endpoint (or the network) misbehaved;
/// `Rpc` is a well-formed protocol-level refusal the model can recover from
/// conversationally; `UnknownTool` is produced by the registry when the model
/// asks for a tool no catalog entry matches.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("protocol error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Client for one remote tool endpoint.
#[derive(Clone)]
pub struct HttpMcpClient {
    endpoint_name: String,
    base_url: Url,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for HttpMcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMcpClient")
            .field("endpoint_name", &self.endpoint_name)
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpMcpClient {
    /// Create a client for the endpoint at `base_url`, reusing a shared
    /// `reqwest` client (connection pool and transport timeout live there).
    #[must_use]
    pub fn new(endpoint_name: impl Into<String>, base_url: Url, http: reqwest::Client) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            base_url,
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    #[must_use]
    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(self.base_url.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| McpError::Malformed(format!("{method}: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(McpError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| McpError::Malformed(format!("missing result in {method}")))
    }

    /// Fire-and-forget notification (a request without an id).
    async fn notify(&self, method: &str) -> Result<(), McpError> {
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": method,
        });
        self.http
            .post(self.base_url.clone())
            .json(&body)
            .send()
            .await?;
        Ok(())
    }

    /// Perform the protocol handshake and return the endpoint's capabilities.
    pub async fn initialize(&self) -> Result<InitializeResult, McpError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "photopilot",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        let parsed: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Malformed(format!("initialize result: {e}")))?;

        // Lifecycle: acknowledge before issuing further requests.
        self.notify("notifications/initialized").await?;

        Ok(parsed)
    }

    /// List every tool the endpoint declares, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let result = self
                .request("tools/list", json!({ "cursor": cursor }))
                .await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::Malformed(format!("tools/list result: {e}")))?;
            out.extend(page.tools);

            match page.next_cursor {
                Some(nc) => cursor = Some(nc),
                None => break,
            }
        }

        Ok(out)
    }

    /// Invoke one named tool. Fails hard: transport and protocol errors
    /// propagate to the caller; retry policy, if any, lives above this layer.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .request(
                "tools/call",
                json!({
                    "name": name,
                    "arguments": arguments,
                }),
            )
            .await?;

        serde_json::from_value(result)
            .map_err(|e| McpError::Malformed(format!("tools/call result: {e}")))
    }
}
