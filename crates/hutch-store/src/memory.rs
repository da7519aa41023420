use std::collections::HashMap;

use crate::blob::BlobStore;
use crate::error::StoreError;

/// In-memory blob store. The default backend for tests and for hosts that
/// wire their own persistence above the database.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored blob, if any.
    pub fn blob(&self, name: &str) -> Option<&str> {
        self.blobs.get(name).map(String::as_str)
    }
}

impl BlobStore for MemoryBlobStore {
    fn data_exists(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    fn read_data(&self, name: &str) -> Result<String, StoreError> {
        self.blobs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn write_data(&mut self, name: &str, data: &str) -> Result<(), StoreError> {
        self.blobs.insert(name.to_string(), data.to_string());
        Ok(())
    }
}
