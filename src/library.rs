//! External collaborator contracts.
//!
//! The concrete services — OS media access, the per-item description model,
//! thumbnail rendering — live outside this crate. Only these narrow traits
//! matter to the core; tests and embedders supply implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One item of the photo collection as enumerated by the library.
#[derive(Debug, Clone)]
pub struct LibraryItem {
    /// Library-local identifier, the key of the processed-item cache.
    pub local_id: String,
    /// Display label (filename) shown as a job's current item.
    pub filename: String,
    /// Capture time, used for newest-first ordering when present.
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the original lives only in remote storage.
    pub is_remote: bool,
}

/// Access to the user's photo collection.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Enumerate the collection. `include_remote` controls whether
    /// cloud-only items appear.
    async fn enumerate(&self, include_remote: bool) -> anyhow::Result<Vec<LibraryItem>>;
}

/// Per-item processing (describe + index one photo).
///
/// Latency is seconds to low minutes per item; callers must treat each call
/// as expensive, awaited I/O.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    /// Process one item, returning its stable opaque identifier on success.
    async fn process(&self, item: &LibraryItem) -> anyhow::Result<String>;
}

/// Thumbnail lookup for presentation enrichment. Never on a core path.
#[async_trait]
pub trait ThumbnailProvider: Send + Sync {
    /// Map each resolvable identifier to renderable thumbnail bytes.
    /// Unresolvable identifiers are simply absent from the result.
    async fn thumbnails(&self, ids: &[String]) -> anyhow::Result<HashMap<String, Vec<u8>>>;
}
