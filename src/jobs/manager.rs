//! Job creation, execution, polling, and cancellation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::jobs::cache::ProcessedItemCache;
use crate::jobs::{IndexingJob, JobOptions, JobStatus};
use crate::library::{ItemProcessor, LibraryItem, PhotoLibrary};
use crate::store::StateStore;

struct JobHandle {
    state: Arc<RwLock<IndexingJob>>,
    cancel: CancellationToken,
}

/// Creates and tracks indexing jobs.
///
/// Job records live only in process memory; a restart loses them but not the
/// processed-item cache, so a fresh start resumes near where the prior run
/// left off.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

struct Inner {
    jobs: RwLock<HashMap<Uuid, JobHandle>>,
    library: Arc<dyn PhotoLibrary>,
    processor: Arc<dyn ItemProcessor>,
    store: Arc<dyn StateStore>,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("job_count", &self.inner.jobs.read().unwrap().len())
            .finish()
    }
}

impl JobManager {
    #[must_use]
    pub fn new(
        library: Arc<dyn PhotoLibrary>,
        processor: Arc<dyn ItemProcessor>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: RwLock::new(HashMap::new()),
                library,
                processor,
                store,
            }),
        }
    }

    /// Create a job and schedule its work asynchronously.
    ///
    /// Returns the job id immediately; the collection scan happens on the
    /// spawned task, never here.
    pub fn start(&self, options: JobOptions) -> Uuid {
        let id = Uuid::new_v4();
        let state = Arc::new(RwLock::new(IndexingJob {
            id,
            status: JobStatus::Pending,
            total: 0,
            processed: 0,
            current_item: None,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }));
        let cancel = CancellationToken::new();

        self.inner.jobs.write().unwrap().insert(
            id,
            JobHandle {
                state: Arc::clone(&state),
                cancel: cancel.clone(),
            },
        );

        tracing::info!(job_id = %id, ?options, "Indexing job scheduled");

        let library = Arc::clone(&self.inner.library);
        let processor = Arc::clone(&self.inner.processor);
        let store = Arc::clone(&self.inner.store);
        tokio::spawn(run_job(state, cancel, options, library, processor, store));

        id
    }

    /// Snapshot of a job's current state. Pure in-memory read, safe to call
    /// at any frequency from any number of pollers.
    #[must_use]
    pub fn status(&self, id: Uuid) -> Option<IndexingJob> {
        self.inner
            .jobs
            .read()
            .unwrap()
            .get(&id)
            .map(|h| h.state.read().unwrap().clone())
    }

    /// Snapshots of every known job.
    #[must_use]
    pub fn list(&self) -> Vec<IndexingJob> {
        self.inner
            .jobs
            .read()
            .unwrap()
            .values()
            .map(|h| h.state.read().unwrap().clone())
            .collect()
    }

    /// Request cooperative cancellation.
    ///
    /// The background task observes the flag at the next iteration boundary,
    /// so the job stops after the in-flight item, not mid-call. Returns
    /// `false` for unknown or already-terminal jobs.
    pub fn cancel(&self, id: Uuid) -> bool {
        let guard = self.inner.jobs.read().unwrap();
        let Some(handle) = guard.get(&id) else {
            return false;
        };
        if handle.state.read().unwrap().status.is_terminal() {
            return false;
        }
        tracing::info!(job_id = %id, "Job cancellation requested");
        handle.cancel.cancel();
        true
    }
}

/// Deterministic processing order: by capture time, undated items last.
fn order_items(items: &mut [LibraryItem], newest_first: bool) {
    if newest_first {
        items.sort_by(|a, b| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    } else {
        items.sort_by(|a, b| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }
}

async fn run_job(
    state: Arc<RwLock<IndexingJob>>,
    cancel: CancellationToken,
    options: JobOptions,
    library: Arc<dyn PhotoLibrary>,
    processor: Arc<dyn ItemProcessor>,
    store: Arc<dyn StateStore>,
) {
    let job_id = state.read().unwrap().id;

    let mut cache = match ProcessedItemCache::load(store).await {
        Ok(c) => c,
        Err(e) => {
            fail(&state, format!("failed to load processed-item cache: {e:#}"));
            return;
        }
    };

    let items = match library.enumerate(options.include_remote).await {
        Ok(items) => items,
        Err(e) => {
            fail(&state, format!("failed to enumerate library: {e:#}"));
            return;
        }
    };

    let mut pending: Vec<LibraryItem> = items
        .into_iter()
        .filter(|i| !cache.contains(&i.local_id))
        .collect();
    order_items(&mut pending, options.newest_first);
    if let Some(cap) = options.batch_size {
        pending.truncate(cap);
    }

    tracing::info!(
        %job_id,
        pending = pending.len(),
        cached = cache.len(),
        "Indexing job running"
    );
    {
        let mut job = state.write().unwrap();
        job.total = pending.len();
        job.status = JobStatus::Running;
    }

    for item in &pending {
        // Cooperative cancel: observed only between items, never mid-call.
        if cancel.is_cancelled() {
            tracing::info!(%job_id, "Indexing job cancelled");
            let mut job = state.write().unwrap();
            job.status = JobStatus::Cancelled;
            job.current_item = None;
            job.completed_at = Some(Utc::now());
            return;
        }

        state.write().unwrap().current_item = Some(item.filename.clone());

        match processor.process(item).await {
            Ok(stable_id) => {
                tracing::debug!(%job_id, item = %item.filename, %stable_id, "Item processed");
                // Cache keys are library-local ids, the same identifier
                // space the pending filter reads. Persist before reporting
                // progress so a crash between the two loses at most the
                // progress counter, never cache state.
                if let Err(e) = cache.insert(item.local_id.clone()).await {
                    fail(&state, format!("failed to persist cache: {e:#}"));
                    return;
                }
                state.write().unwrap().processed += 1;
            }
            Err(e) => {
                fail(&state, format!("failed to process {}: {e:#}", item.filename));
                return;
            }
        }
    }

    {
        let mut job = state.write().unwrap();
        job.status = JobStatus::Completed;
        job.current_item = None;
        job.completed_at = Some(Utc::now());
    }
    tracing::info!(%job_id, total = pending.len(), "Indexing job completed");
}

fn fail(state: &Arc<RwLock<IndexingJob>>, message: String) {
    tracing::error!(job_id = %state.read().unwrap().id, error = %message, "Indexing job failed");
    let mut job = state.write().unwrap();
    job.status = JobStatus::Failed;
    job.error = Some(message);
    job.current_item = None;
    job.completed_at = Some(Utc::now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, day: Option<u32>) -> LibraryItem {
        LibraryItem {
            local_id: id.to_string(),
            filename: format!("{id}.jpg"),
            created_at: day.map(|d| Utc.with_ymd_and_hms(2026, 1, d, 12, 0, 0).unwrap()),
            is_remote: false,
        }
    }

    #[test]
    fn newest_first_puts_undated_items_last() {
        let mut items = vec![item("a", Some(1)), item("b", None), item("c", Some(9))];
        order_items(&mut items, true);
        let order: Vec<&str> = items.iter().map(|i| i.local_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn oldest_first_is_ascending() {
        let mut items = vec![item("c", Some(9)), item("a", Some(1)), item("b", Some(4))];
        order_items(&mut items, false);
        let order: Vec<&str> = items.iter().map(|i| i.local_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
