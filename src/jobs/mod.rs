//! Resumable background indexing jobs.
//!
//! One job walks the photo collection, describes each not-yet-processed item
//! through the [`ItemProcessor`](crate::library::ItemProcessor) collaborator,
//! and records completed identifiers in the persisted
//! [`cache::ProcessedItemCache`]. Progress is exposed as a pollable snapshot;
//! cancellation is cooperative.

pub mod cache;
pub mod manager;

pub use manager::JobManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an indexing job. Terminal states are final: no field of a
/// completed, failed, or cancelled job changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Pollable snapshot of one indexing job.
///
/// Written only by the job's own background task; read by any number of
/// concurrent pollers via [`JobManager::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingJob {
    pub id: Uuid,
    pub status: JobStatus,
    /// Items selected for this run (after cache filtering and batch capping).
    pub total: usize,
    /// Items successfully processed so far.
    pub processed: usize,
    /// Label of the item currently being processed.
    pub current_item: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Options for starting a job.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Cap on how many items this run processes; `None` means all pending.
    pub batch_size: Option<usize>,
    /// Process newest items first (the default).
    pub newest_first: bool,
    /// Include items whose originals live only in remote storage.
    pub include_remote: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            batch_size: None,
            newest_first: true,
            include_remote: false,
        }
    }
}
