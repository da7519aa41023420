use crate::error::StoreError;

/// Key-value blob storage the database persists writable collections through.
///
/// Keys are collection names; values are serialized JSON item arrays. Reads
/// and writes are synchronous — the database core runs inside the host's
/// tick and never suspends.
pub trait BlobStore {
    fn data_exists(&self, name: &str) -> bool;
    fn read_data(&self, name: &str) -> Result<String, StoreError>;
    fn write_data(&mut self, name: &str, data: &str) -> Result<(), StoreError>;
}
