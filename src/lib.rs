//! Photo assistant core.
//!
//! A language model answers questions about a photo library by calling
//! remote tools over an MCP-style JSON-RPC protocol, while a resumable
//! background job keeps the library's index up to date.
//!
//! # Architecture
//!
//! - **MCP client**: per-endpoint JSON-RPC transport, endpoint registry,
//!   fail-soft catalog aggregation
//! - **LLM orchestration**: multi-turn tool loop over a protocol-agnostic
//!   driver, with result truncation and reference extraction
//! - **Jobs**: cancellable, crash-resilient indexing with a persisted
//!   processed-item cache
//!
//! # Modules
//!
//! - [`mcp`]: tool-invocation protocol client and endpoint registry
//! - [`llm`]: model driver, schema adapter, orchestrator
//! - [`session`]: conversation threads
//! - [`jobs`]: background indexing job manager
//! - [`library`]: external collaborator contracts
//! - [`store`]: injected persistence seam
//! - [`config`]: environment and bootstrap-file configuration

pub mod config;
pub mod jobs;
pub mod library;
pub mod llm;
pub mod mcp;
pub mod session;
pub mod store;
pub mod telemetry;

use std::collections::HashMap;
use std::sync::Arc;

use jobs::JobManager;
use library::ThumbnailProvider;
use llm::Orchestrator;
use mcp::registry::ToolRegistry;
use session::SessionStore;

/// Top-level wiring of the core: one of these per running app.
#[derive(Clone)]
pub struct Assistant {
    /// Tool endpoint registry, shared with the orchestrator.
    pub registry: Arc<ToolRegistry>,
    /// Conversation orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Conversation store.
    pub sessions: SessionStore,
    /// Background indexing jobs.
    pub jobs: JobManager,
    thumbnails: Option<Arc<dyn ThumbnailProvider>>,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("registry", &self.registry)
            .field("jobs", &self.jobs)
            .finish()
    }
}

impl Assistant {
    /// Wire up the core from its parts.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        orchestrator: Arc<Orchestrator>,
        jobs: JobManager,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            sessions: SessionStore::new(),
            jobs,
            thumbnails: None,
        }
    }

    /// Attach a thumbnail provider for reference enrichment.
    #[must_use]
    pub fn with_thumbnails(mut self, provider: Arc<dyn ThumbnailProvider>) -> Self {
        self.thumbnails = Some(provider);
        self
    }

    /// Resolve thumbnails for references extracted during a turn.
    ///
    /// Presentation enrichment only: without a provider, or when lookups
    /// fail, the result is simply empty.
    pub async fn thumbnails_for(&self, references: &[String]) -> HashMap<String, Vec<u8>> {
        let Some(provider) = &self.thumbnails else {
            return HashMap::new();
        };
        match provider.thumbnails(references).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail lookup failed");
                HashMap::new()
            }
        }
    }
}
