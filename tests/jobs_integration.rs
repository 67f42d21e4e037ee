//! Indexing job lifecycle: resume, batching, failure, and cancellation,
//! with the cache persisted through a real file-backed store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use photopilot::jobs::cache::CACHE_KEY;
use photopilot::jobs::{IndexingJob, JobManager, JobOptions, JobStatus};
use photopilot::library::{ItemProcessor, LibraryItem, PhotoLibrary};
use photopilot::store::{FileStore, StateStore};

fn item(id: &str, day: u32) -> LibraryItem {
    LibraryItem {
        local_id: id.to_string(),
        filename: format!("{id}.jpg"),
        created_at: Some(Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()),
        is_remote: false,
    }
}

struct StubLibrary {
    items: Vec<LibraryItem>,
}

#[async_trait]
impl PhotoLibrary for StubLibrary {
    async fn enumerate(&self, include_remote: bool) -> anyhow::Result<Vec<LibraryItem>> {
        Ok(self
            .items
            .iter()
            .filter(|i| include_remote || !i.is_remote)
            .cloned()
            .collect())
    }
}

/// Records processing order; optionally fails on one item.
#[derive(Default)]
struct RecordingProcessor {
    processed: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

#[async_trait]
impl ItemProcessor for RecordingProcessor {
    async fn process(&self, item: &LibraryItem) -> anyhow::Result<String> {
        if self.fail_on.as_deref() == Some(item.local_id.as_str()) {
            anyhow::bail!("description model rejected the image");
        }
        self.processed.lock().unwrap().push(item.local_id.clone());
        Ok(item.local_id.clone())
    }
}

/// Returns a describe-service identifier distinct from the library id.
#[derive(Default)]
struct DerivedIdProcessor {
    processed: Mutex<Vec<String>>,
}

#[async_trait]
impl ItemProcessor for DerivedIdProcessor {
    async fn process(&self, item: &LibraryItem) -> anyhow::Result<String> {
        self.processed.lock().unwrap().push(item.local_id.clone());
        Ok(format!("desc-{}", item.local_id))
    }
}

/// Blocks inside `process` until released, so tests can cancel mid-run.
struct GatedProcessor {
    started: Arc<Semaphore>,
    release: Arc<Semaphore>,
    processed: Mutex<Vec<String>>,
}

#[async_trait]
impl ItemProcessor for GatedProcessor {
    async fn process(&self, item: &LibraryItem) -> anyhow::Result<String> {
        self.started.add_permits(1);
        self.release.acquire().await.unwrap().forget();
        self.processed.lock().unwrap().push(item.local_id.clone());
        Ok(item.local_id.clone())
    }
}

async fn wait_terminal(manager: &JobManager, id: Uuid) -> IndexingJob {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = manager.status(id).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state")
}

async fn cached_ids(store: &FileStore) -> Vec<String> {
    match store.read(CACHE_KEY).await.unwrap() {
        Some(text) => serde_json::from_str(&text).unwrap(),
        None => Vec::new(),
    }
}

#[tokio::test]
async fn processes_the_whole_collection_and_caches_each_item() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let library = Arc::new(StubLibrary {
        items: vec![item("a", 1), item("b", 2), item("c", 3)],
    });
    let processor = Arc::new(RecordingProcessor::default());
    let manager = JobManager::new(library, processor, store.clone());

    let id = manager.start(JobOptions::default());
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total, 3);
    assert_eq!(job.processed, 3);
    assert!(job.current_item.is_none());
    assert!(job.completed_at.is_some());
    assert_eq!(cached_ids(&store).await, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn cached_items_are_skipped_on_the_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    store.write(CACHE_KEY, r#"["a","b"]"#).await.unwrap();

    let library = Arc::new(StubLibrary {
        items: vec![item("a", 1), item("b", 2), item("c", 3), item("d", 4)],
    });
    let processor = Arc::new(RecordingProcessor::default());
    let manager = JobManager::new(library, processor.clone(), store.clone());

    let id = manager.start(JobOptions::default());
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total, 2);
    assert_eq!(job.processed, 2);
    // Newest first among the not-yet-cached items.
    assert_eq!(*processor.processed.lock().unwrap(), vec!["d", "c"]);
    assert_eq!(cached_ids(&store).await, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn resume_holds_when_processor_ids_differ_from_library_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let library = Arc::new(StubLibrary {
        items: vec![item("a", 1), item("b", 2)],
    });

    let processor = Arc::new(DerivedIdProcessor::default());
    let manager = JobManager::new(library.clone(), processor.clone(), store.clone());
    let id = manager.start(JobOptions::default());
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    // The cache is keyed on library ids, never the processor's own ids.
    assert_eq!(cached_ids(&store).await, vec!["a", "b"]);

    // A fresh run over the same store has nothing left to do.
    let rerun = Arc::new(DerivedIdProcessor::default());
    let manager = JobManager::new(library, rerun.clone(), store);
    let id = manager.start(JobOptions::default());
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total, 0);
    assert!(rerun.processed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn batch_size_caps_a_single_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let library = Arc::new(StubLibrary {
        items: (1..=5).map(|d| item(&format!("p{d}"), d)).collect(),
    });
    let processor = Arc::new(RecordingProcessor::default());
    let manager = JobManager::new(library, processor, store.clone());

    let id = manager.start(JobOptions {
        batch_size: Some(2),
        ..JobOptions::default()
    });
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total, 2);
    assert_eq!(job.processed, 2);
    assert_eq!(cached_ids(&store).await.len(), 2);
}

#[tokio::test]
async fn item_failure_fails_the_job_but_keeps_earlier_cache_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let library = Arc::new(StubLibrary {
        items: vec![item("a", 3), item("b", 2), item("c", 1)],
    });

    let failing = Arc::new(RecordingProcessor {
        processed: Mutex::new(Vec::new()),
        fail_on: Some("b".to_string()),
    });
    let manager = JobManager::new(library.clone(), failing, store.clone());

    let id = manager.start(JobOptions::default());
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("b.jpg"));
    assert_eq!(job.processed, 1);
    assert_eq!(cached_ids(&store).await, vec!["a"]);

    // A rerun against the same store picks up exactly where the failed run
    // stopped.
    let recovering = Arc::new(RecordingProcessor::default());
    let manager = JobManager::new(library, recovering.clone(), store.clone());
    let id = manager.start(JobOptions::default());
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(*recovering.processed.lock().unwrap(), vec!["b", "c"]);
    assert_eq!(cached_ids(&store).await, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn cancellation_stops_after_the_in_flight_item() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let library = Arc::new(StubLibrary {
        items: vec![item("a", 3), item("b", 2), item("c", 1)],
    });

    let started = Arc::new(Semaphore::new(0));
    let release = Arc::new(Semaphore::new(0));
    let processor = Arc::new(GatedProcessor {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
        processed: Mutex::new(Vec::new()),
    });
    let manager = JobManager::new(library, processor.clone(), store.clone());

    let id = manager.start(JobOptions::default());

    // The first item is in flight; cancel while it blocks.
    started.acquire().await.unwrap().forget();
    assert!(manager.cancel(id));

    // Unblock every item; only the in-flight one may finish.
    release.add_permits(3);
    let job = wait_terminal(&manager, id).await;

    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.processed, 1);
    assert_eq!(*processor.processed.lock().unwrap(), vec!["a"]);
    assert_eq!(cached_ids(&store).await, vec!["a"]);

    // Terminal jobs refuse further cancellation.
    assert!(!manager.cancel(id));
}

#[tokio::test]
async fn cancelling_an_unknown_job_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let manager = JobManager::new(
        Arc::new(StubLibrary { items: Vec::new() }),
        Arc::new(RecordingProcessor::default()),
        store,
    );
    assert!(!manager.cancel(Uuid::new_v4()));
}

#[tokio::test]
async fn remote_items_are_excluded_unless_requested() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    let mut remote = item("cloud", 5);
    remote.is_remote = true;
    let library = Arc::new(StubLibrary {
        items: vec![item("local", 1), remote],
    });
    let processor = Arc::new(RecordingProcessor::default());
    let manager = JobManager::new(library, processor.clone(), store.clone());

    let id = manager.start(JobOptions::default());
    let job = wait_terminal(&manager, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(*processor.processed.lock().unwrap(), vec!["local"]);

    let id = manager.start(JobOptions {
        include_remote: true,
        ..JobOptions::default()
    });
    let job = wait_terminal(&manager, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.processed, 1);
    assert_eq!(cached_ids(&store).await, vec!["cloud", "local"]);
}
