//! Storage abstraction layer for Pilum.
//!
//! The index engine never touches the filesystem directly. Everything goes
//! through the [`Storage`] trait, a flat byte-addressable directory with
//! single-file atomicity and an atomic [`Storage::rename_file`], which the
//! commit protocol uses to publish a new commit point.
//!
//! # Storage Types
//!
//! ## FileStorage
//! - Disk-based persistent storage rooted at a directory
//! - Lock files created with `create_new` for the writer lock
//!
//! ## MemoryStorage
//! - In-memory storage for testing and temporary indexes
//! - Fast but non-persistent
//!
//! # Example
//!
//! ```
//! use pilum::storage::{StorageConfig, StorageFactory};
//! use pilum::storage::memory::MemoryStorageConfig;
//!
//! # fn main() -> pilum::error::Result<()> {
//! let storage = StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default()))?;
//! assert!(storage.list_files()?.is_empty());
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use crate::error::{PilumError, Result};

pub mod file;
pub mod memory;
pub mod structured;

/// A trait for storage backends that can store and retrieve data.
///
/// Implementations must make `create_output` + `close` visible as a whole
/// file (readers never observe a partially written file under its final
/// name) and must make `rename_file` atomic.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any existing file.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Atomically rename a file, replacing `new_name` if it exists.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Sync all pending writes and directory metadata to durable storage.
    fn sync(&self) -> Result<()>;

    /// Try to acquire an exclusive named lock.
    ///
    /// Returns `Ok(None)` when the lock is already held by someone else.
    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>>;

    /// Read a whole file into memory.
    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let mut input = self.open_input(name)?;
        let mut data = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush and sync the output to storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Get the current position in the output stream.
    fn position(&self) -> u64;

    /// Close the output stream, publishing the file.
    fn close(&mut self) -> Result<()>;
}

impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.as_mut().flush_and_sync()
    }

    fn position(&self) -> u64 {
        self.as_ref().position()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

/// A lock on a resource in storage. Dropping the lock releases it.
pub trait StorageLock: Send + std::fmt::Debug {
    /// Get the name of the lock.
    fn name(&self) -> &str;

    /// Release the lock.
    fn release(&mut self) -> Result<()>;

    /// Check if the lock is still held.
    fn is_valid(&self) -> bool;
}

/// Configuration for storage backends.
///
/// Each variant carries the configuration specific to that storage type,
/// including the path for file-based storage.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// File-based storage configuration (includes path)
    File(file::FileStorageConfig),

    /// Memory-based storage configuration
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

/// A factory for creating storage instances.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new storage instance with the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(mem_config) => {
                let storage = memory::MemoryStorage::new(mem_config);
                Ok(Arc::new(storage))
            }
            StorageConfig::File(file_config) => {
                let storage = file::FileStorage::new(file_config)?;
                Ok(Arc::new(storage))
            }
        }
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// I/O error.
    IoError(String),

    /// Invalid operation.
    InvalidOperation(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for PilumError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::IoError(msg) => PilumError::Io(std::io::Error::other(msg)),
            StorageError::FileNotFound(name) => PilumError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {name}"),
            )),
            other @ StorageError::InvalidOperation(_) => PilumError::storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert!(matches!(config, StorageConfig::Memory(_)));
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::FileNotFound("_0.dict".to_string());
        assert_eq!(err.to_string(), "File not found: _0.dict");

        let err = StorageError::InvalidOperation("storage is read-only".to_string());
        assert_eq!(err.to_string(), "Invalid operation: storage is read-only");
    }

    #[test]
    fn test_io_storage_error_becomes_io_failure() {
        let err: PilumError = StorageError::IoError("disk full".to_string()).into();
        assert!(matches!(err, PilumError::Io(_)));
    }

    #[test]
    fn test_missing_file_becomes_not_found() {
        let err: PilumError = StorageError::FileNotFound("_3_2.del".to_string()).into();
        match err {
            PilumError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains("_3_2.del"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_factory_read_all() {
        let storage = StorageFactory::create(StorageConfig::default()).unwrap();
        let mut output = storage.create_output("a.bin").unwrap();
        output.write_all(b"abc").unwrap();
        output.close().unwrap();

        assert_eq!(storage.read_all("a.bin").unwrap(), b"abc");
    }
}
