//! Fixtures shared by the integration tests

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use tasker_bulk::cursor::{CursorBackend, MemoryCursorBackend};
use tasker_bulk::error::StoreError;
use tasker_bulk::progress::Progress;
use tasker_bulk::query::{PredicateScope, RecordQuery};
use tasker_bulk::record::{PostRecord, Record, RecordShape, TermRecord, UserRecord};
use tasker_bulk::store::{MemoryStore, RecordStore};
use tasker_bulk::{BulkTask, SourceRegistry};

pub fn post(id: i64, post_type: &str, post_status: &str) -> PostRecord {
    PostRecord {
        id,
        post_type: post_type.to_string(),
        post_status: post_status.to_string(),
        title: format!("Post {id}"),
        modified_at: Utc::now(),
    }
}

pub fn term(term_taxonomy_id: i64, taxonomy: &str, count: i64) -> TermRecord {
    TermRecord {
        term_taxonomy_id,
        term_id: term_taxonomy_id,
        taxonomy: taxonomy.to_string(),
        name: format!("Term {term_taxonomy_id}"),
        slug: format!("term-{term_taxonomy_id}"),
        count,
    }
}

pub fn user(id: i64, roles: &[&str]) -> UserRecord {
    UserRecord {
        id,
        login: format!("user{id}"),
        email: format!("user{id}@example.com"),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

/// Memory store holding published posts with the given ids
pub fn store_with_posts(ids: impl IntoIterator<Item = i64>) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for id in ids {
        store.insert_post(post(id, "post", "publish"));
    }
    Arc::new(store)
}

/// A task over `store` whose cursor lives in `backend`
pub fn task_for(
    task_key: &str,
    store: Arc<MemoryStore>,
    backend: Arc<MemoryCursorBackend>,
) -> BulkTask {
    let backend: Arc<dyn CursorBackend> = backend;
    BulkTask::new(task_key, SourceRegistry::with_store(store)).with_cursor_backend(backend)
}

pub fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file.flush().expect("flush csv");
    file
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Total(i64),
    Current(i64),
    Finished,
}

/// Progress reporter that remembers every notification
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    pub fn finished(&self) -> bool {
        self.events.lock().contains(&ProgressEvent::Finished)
    }
}

impl Progress for RecordingProgress {
    fn set_total(&self, total: i64) {
        self.events.lock().push(ProgressEvent::Total(total));
    }

    fn set_current(&self, current: i64) {
        self.events.lock().push(ProgressEvent::Current(current));
    }

    fn set_finished(&self) {
        self.events.lock().push(ProgressEvent::Finished);
    }
}

/// Record store that counts every call before delegating
#[derive(Debug)]
pub struct CountingStore {
    inner: Arc<MemoryStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    fn scope(&self) -> &PredicateScope {
        self.inner.scope()
    }

    async fn max_key(&self, shape: RecordShape) -> Result<i64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.max_key(shape).await
    }

    async fn execute(&self, query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(query).await
    }
}

/// Cursor backend that counts every call before delegating
#[derive(Debug, Default)]
pub struct CountingCursorBackend {
    inner: MemoryCursorBackend,
    calls: AtomicUsize,
}

impl CountingCursorBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CursorBackend for CountingCursorBackend {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, value: i64) -> Result<bool, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.save(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}
