//! Tool endpoint registry and catalog aggregation.
//!
//! The registry owns the set of configured endpoints, persists them through
//! the injected [`StateStore`], and flattens the tool listings of every
//! enabled endpoint into one namespaced catalog. Aggregation fails soft per
//! endpoint: an unreachable endpoint contributes zero tools and a warning,
//! never an error for its peers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::config::EndpointsFile;
use crate::mcp::args::coerce_arguments;
use crate::mcp::client::{HttpMcpClient, McpError};
use crate::mcp::types::{CallToolResult, ToolDescriptor};
use crate::store::StateStore;

const ENDPOINTS_KEY: &str = "tool-endpoints";

/// Transport timeout for tool endpoints. Generous: some tools run an
/// inference call per invocation.
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(60);

/// One configured remote tool endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEndpoint {
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    pub enabled: bool,
    /// Built-in endpoints can be disabled but never removed.
    pub builtin: bool,
}

/// Owned store of endpoints plus the most recent aggregated catalog.
pub struct ToolRegistry {
    endpoints: RwLock<Vec<ToolEndpoint>>,
    // namespaced_tool_name -> descriptor, rebuilt on each aggregation
    catalog: RwLock<HashMap<String, ToolDescriptor>>,
    http: reqwest::Client,
    store: Arc<dyn StateStore>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("endpoint_count", &self.endpoints.read().unwrap().len())
            .field("catalog_size", &self.catalog.read().unwrap().len())
            .finish()
    }
}

impl ToolRegistry {
    /// Load persisted endpoints from the store, seeding from `bootstrap`
    /// when nothing has been persisted yet (first launch).
    pub async fn load(
        store: Arc<dyn StateStore>,
        bootstrap: &EndpointsFile,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(ENDPOINT_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        let endpoints = match store.read(ENDPOINTS_KEY).await? {
            Some(text) => {
                serde_json::from_str(&text).context("failed to parse persisted endpoints")?
            }
            None => {
                let seeded: Vec<ToolEndpoint> = bootstrap
                    .tool_endpoints
                    .iter()
                    .map(|(name, entry)| ToolEndpoint {
                        id: Uuid::new_v4(),
                        name: name.clone(),
                        base_url: entry.url.clone(),
                        enabled: true,
                        builtin: entry.builtin,
                    })
                    .collect();
                store
                    .write(ENDPOINTS_KEY, &serde_json::to_string(&seeded)?)
                    .await?;
                tracing::info!(count = seeded.len(), "Seeded tool endpoints from bootstrap");
                seeded
            }
        };

        Ok(Self {
            endpoints: RwLock::new(endpoints),
            catalog: RwLock::new(HashMap::new()),
            http,
            store,
        })
    }

    /// Snapshot of all configured endpoints.
    #[must_use]
    pub fn list_endpoints(&self) -> Vec<ToolEndpoint> {
        self.endpoints.read().unwrap().clone()
    }

    /// Register a new user-added endpoint. The address must be a valid URL.
    pub async fn add_endpoint(&self, name: &str, base_url: &str) -> anyhow::Result<Uuid> {
        Url::parse(base_url).with_context(|| format!("invalid endpoint url: {base_url}"))?;

        let endpoint = ToolEndpoint {
            id: Uuid::new_v4(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            enabled: true,
            builtin: false,
        };
        let id = endpoint.id;
        self.endpoints.write().unwrap().push(endpoint);
        self.persist().await?;

        tracing::info!(endpoint = name, %id, "Tool endpoint added");
        Ok(id)
    }

    /// Remove an endpoint. Built-in endpoints are kept (returns `false`),
    /// as is an id that matches nothing.
    pub async fn remove_endpoint(&self, id: Uuid) -> anyhow::Result<bool> {
        let removed = {
            let mut guard = self.endpoints.write().unwrap();
            let before = guard.len();
            guard.retain(|e| e.id != id || e.builtin);
            guard.len() < before
        };
        if removed {
            self.persist().await?;
            tracing::info!(%id, "Tool endpoint removed");
        }
        Ok(removed)
    }

    /// Enable or disable an endpoint. Disabled endpoints contribute no tools.
    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> anyhow::Result<()> {
        {
            let mut guard = self.endpoints.write().unwrap();
            let endpoint = guard
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| anyhow!("unknown endpoint: {id}"))?;
            endpoint.enabled = enabled;
        }
        self.persist().await
    }

    async fn persist(&self) -> anyhow::Result<()> {
        let snapshot = self.endpoints.read().unwrap().clone();
        self.store
            .write(ENDPOINTS_KEY, &serde_json::to_string(&snapshot)?)
            .await
    }

    /// Sanitize namespaced tool names for model API compatibility
    /// (function names must match `^[a-zA-Z0-9_-]+$`).
    fn sanitize_tool_name(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn client_for(&self, endpoint: &ToolEndpoint) -> Result<HttpMcpClient, McpError> {
        let url = Url::parse(&endpoint.base_url)
            .map_err(|e| McpError::Malformed(format!("bad endpoint url: {e}")))?;
        Ok(HttpMcpClient::new(
            endpoint.name.clone(),
            url,
            self.http.clone(),
        ))
    }

    /// Fetch a fresh tool catalog across all enabled endpoints.
    ///
    /// Per-endpoint failures are isolated: the failing endpoint is skipped
    /// with a warning and the remaining endpoints' tools are still returned.
    pub async fn aggregate_tools(&self) -> Vec<ToolDescriptor> {
        let enabled: Vec<ToolEndpoint> = self
            .endpoints
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.enabled)
            .cloned()
            .collect();

        let mut descriptors = Vec::new();

        for endpoint in &enabled {
            let client = match self.client_for(endpoint) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint.name, error = %e, "Skipping endpoint");
                    continue;
                }
            };

            let tools = match client.initialize().await {
                Ok(_) => match client.list_tools().await {
                    Ok(tools) => tools,
                    Err(e) => {
                        tracing::warn!(
                            endpoint = %endpoint.name,
                            error = %e,
                            "tools/list failed, endpoint contributes no tools"
                        );
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        endpoint = %endpoint.name,
                        error = %e,
                        "handshake failed, endpoint contributes no tools"
                    );
                    continue;
                }
            };

            for tool in tools {
                let namespaced_name =
                    Self::sanitize_tool_name(&format!("{}__{}", endpoint.name, tool.name));
                descriptors.push(ToolDescriptor {
                    endpoint_id: endpoint.id,
                    endpoint_name: endpoint.name.clone(),
                    namespaced_name,
                    tool,
                });
            }
        }

        let mut catalog = self.catalog.write().unwrap();
        catalog.clear();
        for d in &descriptors {
            catalog.insert(d.namespaced_name.clone(), d.clone());
        }
        drop(catalog);

        tracing::info!(
            endpoint_count = enabled.len(),
            tool_count = descriptors.len(),
            "Aggregated tool catalog"
        );
        descriptors
    }

    /// Execute a namespaced tool from the last aggregated catalog, e.g.
    /// `photos__search_photos`. Arguments are coerced to the declared schema
    /// types before dispatch.
    pub async fn call_tool(
        &self,
        namespaced_tool: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        let descriptor = self
            .catalog
            .read()
            .unwrap()
            .get(namespaced_tool)
            .cloned()
            .ok_or_else(|| McpError::UnknownTool(namespaced_tool.to_string()))?;

        let endpoint = self
            .endpoints
            .read()
            .unwrap()
            .iter()
            .find(|e| e.id == descriptor.endpoint_id && e.enabled)
            .cloned()
            .ok_or_else(|| McpError::UnknownTool(namespaced_tool.to_string()))?;

        let arguments = coerce_arguments(&descriptor.tool.input_schema, arguments);

        let client = self.client_for(&endpoint)?;
        client.call_tool(&descriptor.tool.name, arguments).await
    }
}
