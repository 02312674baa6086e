//! Commit points.
//!
//! A commit point names, in order, the segments that make up the index at
//! one generation, together with the tombstone generation and deleted count
//! of each. It is written as a JSON body inside the usual checksummed
//! envelope, first under `pending_segments_<gen>` and then renamed to
//! `segments_<gen>`, so a crash never leaves a partially written commit
//! under its final name.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PilumError, Result};
use crate::index::file_names;
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

const MAGIC: u32 = 0x5053_4547; // "PSEG"
const VERSION: u32 = 1;

/// One segment entry of a commit point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCommitInfo {
    /// Segment name.
    pub name: String,

    /// Documents in the segment, deleted ones included.
    pub doc_count: u32,

    /// Generation of the tombstone file, 0 when there is none.
    pub del_gen: u64,

    /// Deleted documents recorded in the tombstone file.
    pub del_count: u32,
}

impl SegmentCommitInfo {
    /// Tombstone file of this entry, if any.
    pub fn deletes_file(&self) -> Option<String> {
        (self.del_gen > 0).then(|| file_names::deletes_file(&self.name, self.del_gen))
    }
}

/// The list of segments published by one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPoint {
    /// Commit generation. Generation 0 is the empty index that was never committed.
    pub generation: u64,

    /// Next value of the segment name counter.
    pub segment_counter: u64,

    /// Segments in index order.
    pub segments: Vec<SegmentCommitInfo>,
}

impl CommitPoint {
    /// Name of this commit's file.
    pub fn file_name(&self) -> String {
        file_names::commit_file(self.generation)
    }

    /// Every file this commit references, its own file included.
    pub fn files(&self) -> Vec<String> {
        let mut files = Vec::with_capacity(self.segments.len() * 4 + 1);
        if self.generation > 0 {
            files.push(self.file_name());
        }
        for segment in &self.segments {
            files.extend(file_names::segment_files(&segment.name));
            files.extend(segment.deletes_file());
        }
        files
    }

    /// Look up a segment entry by name.
    pub fn segment(&self, name: &str) -> Option<&SegmentCommitInfo> {
        self.segments.iter().find(|segment| segment.name == name)
    }

    /// Publish this commit point.
    ///
    /// The body is written to a pending file, atomically renamed to
    /// `segments_<gen>`, and the storage synced. An `Err` means
    /// `segments_<gen>` is not in storage and the previous commit is still
    /// the latest. When the sync fails the renamed file is withdrawn; if it
    /// cannot be withdrawn the commit stands and `Ok` is returned.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let pending = file_names::pending_commit_file(self.generation);
        let body = serde_json::to_vec(self)?;

        if let Err(e) = self.write_pending(storage, &pending, &body) {
            let _ = storage.delete_file(&pending);
            return Err(e);
        }

        if let Err(e) = storage.sync() {
            let name = self.file_name();
            match storage.delete_file(&name) {
                Ok(()) if !storage.file_exists(&name) => {
                    warn!(
                        target: "pilum::index::commit",
                        generation = self.generation,
                        error = %e,
                        "sync failed; commit point withdrawn"
                    );
                    return Err(e);
                }
                _ => warn!(
                    target: "pilum::index::commit",
                    generation = self.generation,
                    error = %e,
                    "sync failed after commit point was published; keeping it"
                ),
            }
        }

        debug!(
            target: "pilum::index::commit",
            generation = self.generation,
            segments = self.segments.len(),
            "published commit point"
        );
        Ok(())
    }

    fn write_pending(&self, storage: &dyn Storage, pending: &str, body: &[u8]) -> Result<()> {
        let mut writer = StructWriter::new(storage.create_output(pending)?, MAGIC, VERSION)?;
        writer.write_bytes(body)?;
        writer.finish()?;
        storage.rename_file(pending, &self.file_name())
    }

    /// Read the commit point stored in `name`.
    pub fn read(storage: &dyn Storage, name: &str) -> Result<Self> {
        let data = storage.read_all(name)?;
        let mut reader = StructReader::open(name, &data, MAGIC, VERSION)?;
        let commit: CommitPoint = serde_json::from_slice(reader.read_bytes()?)
            .map_err(|e| PilumError::corrupt(format!("{name}: {e}")))?;

        if file_names::commit_generation(name) != Some(commit.generation) {
            return Err(PilumError::corrupt(format!(
                "{name}: records generation {}",
                commit.generation
            )));
        }
        Ok(commit)
    }

    /// Generation of the newest published commit, if any.
    pub fn latest_generation(storage: &dyn Storage) -> Result<Option<u64>> {
        Ok(storage
            .list_files()?
            .iter()
            .filter_map(|name| file_names::commit_generation(name))
            .max())
    }

    /// Read the newest published commit point.
    ///
    /// Returns `None` for a storage that holds no commit. A damaged newest
    /// commit is reported as corruption; older generations are not consulted.
    pub fn read_latest(storage: &dyn Storage) -> Result<Option<Self>> {
        match Self::latest_generation(storage)? {
            Some(generation) => {
                Self::read(storage, &file_names::commit_file(generation)).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::PilumError;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::{StorageInput, StorageLock, StorageOutput};

    /// Memory storage whose `sync` always fails, and whose deletes
    /// optionally fail as well.
    #[derive(Debug, Default)]
    struct SyncFailingStorage {
        inner: MemoryStorage,
        fail_delete: bool,
    }

    impl Storage for SyncFailingStorage {
        fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
            self.inner.open_input(name)
        }

        fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
            self.inner.create_output(name)
        }

        fn file_exists(&self, name: &str) -> bool {
            self.inner.file_exists(name)
        }

        fn delete_file(&self, name: &str) -> Result<()> {
            if self.fail_delete {
                return Err(PilumError::Io(std::io::Error::other("delete failed")));
            }
            self.inner.delete_file(name)
        }

        fn list_files(&self) -> Result<Vec<String>> {
            self.inner.list_files()
        }

        fn file_size(&self, name: &str) -> Result<u64> {
            self.inner.file_size(name)
        }

        fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
            self.inner.rename_file(old_name, new_name)
        }

        fn sync(&self) -> Result<()> {
            Err(PilumError::Io(std::io::Error::other("sync failed")))
        }

        fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>> {
            self.inner.try_acquire_lock(name)
        }
    }

    fn sample(generation: u64) -> CommitPoint {
        CommitPoint {
            generation,
            segment_counter: 3,
            segments: vec![
                SegmentCommitInfo {
                    name: "_0".to_string(),
                    doc_count: 10,
                    del_gen: 0,
                    del_count: 0,
                },
                SegmentCommitInfo {
                    name: "_2".to_string(),
                    doc_count: 4,
                    del_gen: generation,
                    del_count: 1,
                },
            ],
        }
    }

    #[test]
    fn test_write_and_read_latest() {
        let storage = MemoryStorage::default();
        assert!(CommitPoint::read_latest(&storage).unwrap().is_none());

        sample(1).write(&storage).unwrap();
        sample(2).write(&storage).unwrap();

        let latest = CommitPoint::read_latest(&storage).unwrap().unwrap();
        assert_eq!(latest, sample(2));
        assert!(!storage.file_exists(&file_names::pending_commit_file(2)));
    }

    #[test]
    fn test_files() {
        let files = sample(37).files();
        assert_eq!(
            files,
            vec![
                "segments_11", "_0.dict", "_0.post", "_0.docs", "_2.dict", "_2.post", "_2.docs",
                "_2_11.del"
            ]
        );
        assert!(CommitPoint::default().files().is_empty());
    }

    #[test]
    fn test_corrupt_latest_is_fatal() {
        let storage = MemoryStorage::default();
        sample(1).write(&storage).unwrap();
        sample(2).write(&storage).unwrap();
        storage.corrupt_file("segments_2", 12).unwrap();

        let err = CommitPoint::read_latest(&storage).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_failed_sync_withdraws_commit_point() {
        let storage = SyncFailingStorage::default();
        sample(1).write(&storage.inner).unwrap();

        let err = sample(2).write(&storage).unwrap_err();
        assert!(matches!(err, PilumError::Io(_)));
        assert!(!storage.file_exists("segments_2"));
        assert!(!storage.file_exists("pending_segments_2"));
        assert_eq!(CommitPoint::read_latest(&storage).unwrap().unwrap(), sample(1));
    }

    #[test]
    fn test_failed_sync_keeps_commit_point_it_cannot_withdraw() {
        let storage = SyncFailingStorage {
            fail_delete: true,
            ..Default::default()
        };
        sample(1).write(&storage).unwrap();

        assert_eq!(CommitPoint::read_latest(&storage).unwrap().unwrap(), sample(1));
    }

    #[test]
    fn test_pending_file_is_ignored() {
        let storage = MemoryStorage::default();
        sample(1).write(&storage).unwrap();
        let mut output = storage.create_output("pending_segments_2").unwrap();
        output.write_all(b"partial").unwrap();
        output.close().unwrap();

        assert_eq!(CommitPoint::latest_generation(&storage).unwrap(), Some(1));
    }
}
