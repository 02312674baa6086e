#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use pilum::prelude::*;
use pilum::storage::memory::MemoryStorage;
use pilum::storage::{StorageInput, StorageLock, StorageOutput};

pub fn memory_index() -> (Arc<MemoryStorage>, IndexDirectory) {
    memory_index_with(IndexConfig::default())
}

/// Route engine logs to the test harness; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn memory_index_with(config: IndexConfig) -> (Arc<MemoryStorage>, IndexDirectory) {
    init_tracing();
    let storage = Arc::new(MemoryStorage::default());
    let directory = IndexDirectory::open(storage.clone(), config).unwrap();
    (storage, directory)
}

pub fn doc(id: &str, author: &str, content: &str) -> Document {
    Document::builder()
        .add_text("id", id, FieldOptions::STORED_NOT_ANALYZED)
        .add_text("author", author, FieldOptions::STORED_ANALYZED)
        .add_text("content", content, FieldOptions::NOT_STORED_ANALYZED)
        .build()
}

pub fn id_term(id: &str) -> Term {
    Term::new("id", id)
}

/// Stored `id` values of the hits, best first.
pub fn hit_ids(reader: &IndexReader, top: &TopDocs) -> Vec<String> {
    top.hits
        .iter()
        .map(|hit| {
            reader
                .document(hit)
                .unwrap()
                .get_text("id")
                .unwrap()
                .to_string()
        })
        .collect()
}

pub fn search_ids(directory: &IndexDirectory, field: &str, text: &str) -> Vec<String> {
    let reader = directory.reader();
    let top = reader.search_text(field, text, 100).unwrap();
    hit_ids(&reader, &top)
}

fn injected(operation: &str, name: &str) -> PilumError {
    PilumError::Io(std::io::Error::other(format!("injected {operation} failure: {name}")))
}

/// Memory storage with switchable failures.
///
/// It also records which files existed each time a lock was released.
#[derive(Debug, Default)]
pub struct FaultyStorage {
    inner: Arc<MemoryStorage>,
    fail_create_suffix: Mutex<Option<String>>,
    fail_rename: AtomicBool,
    fail_sync: AtomicBool,
    files_at_unlock: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FaultyStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail `create_output` for every file name ending in `suffix`.
    pub fn fail_create(&self, suffix: &str) {
        *self.fail_create_suffix.lock() = Some(suffix.to_string());
    }

    pub fn fail_rename(&self, fail: bool) {
        self.fail_rename.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sync(&self, fail: bool) {
        self.fail_sync.store(fail, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        *self.fail_create_suffix.lock() = None;
        self.fail_rename(false);
        self.fail_sync(false);
    }

    /// File listings taken at each lock release, oldest first.
    pub fn files_at_unlock(&self) -> Vec<Vec<String>> {
        self.files_at_unlock.lock().clone()
    }

    pub fn files(&self) -> Vec<String> {
        self.inner.list_files().unwrap()
    }
}

impl Storage for FaultyStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.inner.open_input(name)
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        if let Some(suffix) = self.fail_create_suffix.lock().as_deref()
            && name.ends_with(suffix)
        {
            return Err(injected("create", name));
        }
        self.inner.create_output(name)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.inner.file_exists(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.inner.delete_file(name)
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.inner.list_files()
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.inner.file_size(name)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        if self.fail_rename.load(Ordering::SeqCst) {
            return Err(injected("rename", old_name));
        }
        self.inner.rename_file(old_name, new_name)
    }

    fn sync(&self) -> Result<()> {
        if self.fail_sync.load(Ordering::SeqCst) {
            return Err(injected("sync", "directory"));
        }
        self.inner.sync()
    }

    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>> {
        Ok(self.inner.try_acquire_lock(name)?.map(|lock| {
            Box::new(RecordingLock {
                inner: lock,
                storage: Arc::clone(&self.inner),
                files_at_unlock: Arc::clone(&self.files_at_unlock),
            }) as Box<dyn StorageLock>
        }))
    }
}

#[derive(Debug)]
struct RecordingLock {
    inner: Box<dyn StorageLock>,
    storage: Arc<MemoryStorage>,
    files_at_unlock: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingLock {
    fn record(&self) {
        if self.inner.is_valid() {
            let files = self.storage.list_files().unwrap_or_default();
            self.files_at_unlock.lock().push(files);
        }
    }
}

impl StorageLock for RecordingLock {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn release(&mut self) -> Result<()> {
        self.record();
        self.inner.release()
    }

    fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }
}

impl Drop for RecordingLock {
    fn drop(&mut self) {
        self.record();
    }
}
