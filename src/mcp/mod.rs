//! Tool-invocation protocol client (MCP-style, JSON-RPC over HTTP).
//!
//! Endpoints are configured in the [`registry::ToolRegistry`], which persists
//! them through the injected state store and aggregates each enabled
//! endpoint's `tools/list` into one flat catalog.
//!
//! # Tool namespacing
//!
//! Tools are namespaced by endpoint name, `endpoint__tool`
//! (e.g. `photos__search_photos`), so the same tool name on two endpoints
//! stays distinguishable downstream.

pub mod args;
pub mod client;
pub mod registry;
pub mod types;
